use autoguard_store::models::UaPatternType;
use regex::RegexBuilder;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct UaEntry {
    pub pattern: String,
    #[serde(rename = "type")]
    pub pattern_type: UaPatternType,
}

/// L1 UA matching: `exact` is byte equality, `contains` is ASCII
/// case-insensitive substring, `regex` is a case-insensitive match. A
/// malformed regex is treated as non-matching and logged, never
/// propagated — a bad rule must not take down the hot path.
pub fn matches(entry: &UaEntry, user_agent: &str) -> bool {
    match entry.pattern_type {
        UaPatternType::Exact => entry.pattern == user_agent,
        UaPatternType::Contains => user_agent
            .to_ascii_lowercase()
            .contains(&entry.pattern.to_ascii_lowercase()),
        UaPatternType::Regex => match RegexBuilder::new(&entry.pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re.is_match(user_agent),
            Err(e) => {
                warn!(pattern = %entry.pattern, error = %e, "malformed UA regex rule, skipping");
                false
            }
        },
    }
}

pub fn parse_entries(raw: &[String]) -> Vec<UaEntry> {
    raw.iter()
        .filter_map(|json| serde_json::from_str(json).ok())
        .collect()
}

const CRAWLER_TOKENS: &[&str] = &[
    "bot", "crawl", "spider", "slurp", "bingpreview", "facebookexternalhit", "curl", "wget",
    "python-requests", "scrapy", "headlesschrome", "phantomjs",
];

/// L4 heuristics beyond L1's exact/contains/regex rule list: common
/// crawler tokens, headless-browser signatures, and missing/empty UA.
pub fn looks_automated(user_agent: &str) -> bool {
    if user_agent.trim().is_empty() {
        return true;
    }
    let lower = user_agent.to_ascii_lowercase();
    CRAWLER_TOKENS.iter().any(|token| lower.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_requires_byte_equality() {
        let entry = UaEntry {
            pattern: "BadBot/1.0".into(),
            pattern_type: UaPatternType::Exact,
        };
        assert!(matches(&entry, "BadBot/1.0"));
        assert!(!matches(&entry, "BadBot/1.1"));
    }

    #[test]
    fn contains_match_is_case_insensitive() {
        let entry = UaEntry {
            pattern: "scrapy".into(),
            pattern_type: UaPatternType::Contains,
        };
        assert!(matches(&entry, "Mozilla/5.0 (compatible; Scrapy/2.8)"));
    }

    #[test]
    fn malformed_regex_never_matches() {
        let entry = UaEntry {
            pattern: "(unclosed".into(),
            pattern_type: UaPatternType::Regex,
        };
        assert!(!matches(&entry, "anything"));
    }

    #[test]
    fn empty_user_agent_looks_automated() {
        assert!(looks_automated(""));
        assert!(looks_automated("   "));
    }

    #[test]
    fn crawler_token_detected_case_insensitively() {
        assert!(looks_automated("Googlebot/2.1"));
        assert!(looks_automated("python-requests/2.31.0"));
        assert!(!looks_automated("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"));
    }
}
