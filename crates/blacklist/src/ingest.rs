//! External blacklist source file parsing: one rule per line, `#`/`//`/`;`
//! comments, optional `value,reason` CSV, IPv4 dotted-quad or CIDR
//! values. Anything else is dropped and counted.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEntry {
    Ip { address: String, reason: Option<String> },
    Cidr { cidr: String, reason: Option<String> },
}

#[derive(Debug, Default, Clone)]
pub struct IngestReport {
    pub ips: Vec<ParsedEntry>,
    pub cidrs: Vec<ParsedEntry>,
    pub dropped: usize,
}

pub fn parse(body: &str) -> IngestReport {
    let mut report = IngestReport::default();
    for raw_line in body.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") || line.starts_with(';') {
            continue;
        }

        let (value, reason) = match line.split_once(',') {
            Some((value, reason)) => (value.trim(), Some(reason.trim().to_string())),
            None => (line, None),
        };

        if is_ipv4(value) {
            report.ips.push(ParsedEntry::Ip {
                address: value.to_string(),
                reason,
            });
        } else if is_ipv4_cidr(value) {
            report.cidrs.push(ParsedEntry::Cidr {
                cidr: value.to_string(),
                reason,
            });
        } else {
            report.dropped += 1;
        }
    }
    report
}

fn is_ipv4(value: &str) -> bool {
    value.parse::<std::net::Ipv4Addr>().is_ok()
}

fn is_ipv4_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix.parse::<u8>() else {
        return false;
    };
    addr.parse::<std::net::Ipv4Addr>().is_ok() && prefix_len <= 32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ips_cidrs_and_comments() {
        let body = "\
            # a comment\n\
            // another comment\n\
            ; yet another\n\
            1.2.3.4\n\
            10.0.0.0/8,datacenter range\n\
            not-an-ip\n\
            2001:db8::1\n\
        ";
        let report = parse(body);
        assert_eq!(report.ips.len(), 1);
        assert_eq!(report.cidrs.len(), 1);
        assert_eq!(report.dropped, 2); // "not-an-ip" and the IPv6 literal
    }

    #[test]
    fn reason_is_extracted_from_csv_form() {
        let report = parse("5.6.7.8,known scraper");
        match &report.ips[0] {
            ParsedEntry::Ip { address, reason } => {
                assert_eq!(address, "5.6.7.8");
                assert_eq!(reason.as_deref(), Some("known scraper"));
            }
            _ => panic!("expected an ip entry"),
        }
    }

    #[test]
    fn rejects_cidr_with_out_of_range_prefix() {
        let report = parse("1.2.3.4/99");
        assert_eq!(report.dropped, 1);
    }
}
