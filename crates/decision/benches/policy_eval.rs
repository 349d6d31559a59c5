//! Benchmarks for the decision engine's symbolic layers — the parts of
//! `decide()` that do no I/O and must stay microsecond-scale regardless
//! of how many rules a scope accumulates: CIDR containment (L1), UA
//! pattern matching (L1/L4), and the referer moderation-tool check (L5).
//! Mirrors the teacher's `packages/gate/benches/policy_eval.rs` shape —
//! one `benchmark_group` per check, `BenchmarkId::from_parameter` varying
//! either input size or input complexity.

use autoguard_decision::cidr::CidrSet;
use autoguard_decision::ua::{self, UaEntry};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn sample_cidrs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.{}.{}.0/24", (i / 256) % 256, i % 256))
        .collect()
}

fn benchmark_cidr_containment(c: &mut Criterion) {
    let mut group = c.benchmark_group("cidr_containment");
    for size in [10usize, 100, 1000] {
        let set = CidrSet::from_cidr_strings(&sample_cidrs(size));
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| set.contains(black_box("10.3.200.7".parse().unwrap())));
        });
    }
    group.finish();
}

fn sample_ua_entries(count: usize) -> Vec<UaEntry> {
    let raw: Vec<String> = (0..count)
        .map(|i| format!("{{\"pattern\":\"bot-{i}\",\"type\":\"Contains\"}}"))
        .collect();
    ua::parse_entries(&raw)
}

fn benchmark_ua_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("ua_matching");
    let needle = "Mozilla/5.0 (compatible; real-browser-tag)";
    for size in [10usize, 100, 1000] {
        let entries = sample_ua_entries(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| entries.iter().any(|e| ua::matches(e, black_box(needle))));
        });
    }
    group.finish();
}

fn benchmark_looks_automated(c: &mut Criterion) {
    let mut group = c.benchmark_group("looks_automated");
    let agents = [
        ("browser", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
        ("curl", "curl/8.4.0"),
        ("empty", ""),
    ];
    for (name, ua_str) in agents {
        group.bench_with_input(BenchmarkId::from_parameter(name), &ua_str, |b, ua_str| {
            b.iter(|| ua::looks_automated(black_box(ua_str)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_cidr_containment,
    benchmark_ua_matching,
    benchmark_looks_automated,
);
criterion_main!(benches);
