use std::net::Ipv4Addr;

/// Parsed CIDR ranges held as `(network, mask)` `u32` pairs — the hot
/// path does integer bitwise containment, never string parsing or
/// re-parsing per request, per the spec's explicit instruction.
#[derive(Debug, Clone, Default)]
pub struct CidrSet {
    ranges: Vec<(u32, u32)>,
}

impl CidrSet {
    /// Parses the materialized JSON list of `"a.b.c.d/p"` strings.
    /// Entries that fail to parse are skipped (the materializer should
    /// never write an invalid one, but the hot path stays defensive).
    pub fn from_json_list(raw: &str) -> Self {
        let cidrs: Vec<String> = serde_json::from_str(raw).unwrap_or_default();
        Self::from_cidr_strings(&cidrs)
    }

    pub fn from_cidr_strings(cidrs: &[String]) -> Self {
        let mut ranges = Vec::with_capacity(cidrs.len());
        for cidr in cidrs {
            if let Some((network, mask)) = parse_cidr(cidr) {
                ranges.push((network, mask));
            }
        }
        Self { ranges }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let addr = u32::from(ip);
        self.ranges
            .iter()
            .any(|&(network, mask)| addr & mask == network & mask)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_cidr(cidr: &str) -> Option<(u32, u32)> {
    let (addr, prefix) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix_len: u32 = prefix.parse().ok()?;
    if prefix_len > 32 {
        return None;
    }
    let mask = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    };
    Some((u32::from(addr), mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_zero_matches_every_address() {
        let set = CidrSet::from_cidr_strings(&["0.0.0.0/0".to_string()]);
        assert!(set.contains("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn slash_thirty_two_matches_exactly_one_address() {
        let set = CidrSet::from_cidr_strings(&["10.0.0.5/32".to_string()]);
        assert!(set.contains("10.0.0.5".parse().unwrap()));
        assert!(!set.contains("10.0.0.6".parse().unwrap()));
    }

    #[test]
    fn typical_range_matches_contained_addresses_only() {
        let set = CidrSet::from_cidr_strings(&["192.168.1.0/24".to_string()]);
        assert!(set.contains("192.168.1.200".parse().unwrap()));
        assert!(!set.contains("192.168.2.1".parse().unwrap()));
    }

    #[test]
    fn invalid_entries_are_skipped_not_fatal() {
        let set = CidrSet::from_cidr_strings(&["not-a-cidr".to_string(), "10.0.0.0/8".to_string()]);
        assert!(set.contains("10.1.2.3".parse().unwrap()));
    }
}
