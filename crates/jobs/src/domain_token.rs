//! Deterministic custom-domain verification token: `ag-verify=<token>`
//! is the TXT record value the domain-verification job looks for.
//! Derived from the offer's subdomain plus a constant salt so the same
//! offer always re-derives the same token (no extra state to persist
//! beyond what's already on the offer row), base64-truncated to 12
//! characters with the non-alphanumeric `+`/`/`/`=` stripped so it's
//! safe to drop straight into a TXT record value.

use base64::Engine;
use sha2::{Digest, Sha256};

const SALT: &str = "autoguard-domain-verify-v1";

pub fn derive_token(subdomain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subdomain.as_bytes());
    hasher.update(b":");
    hasher.update(SALT.as_bytes());
    let digest = hasher.finalize();

    let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
    let stripped: String = encoded.chars().filter(|c| *c != '+' && *c != '/' && *c != '=').collect();
    stripped.chars().take(12).collect()
}

pub fn txt_record_value(token: &str) -> String {
    format!("ag-verify={token}")
}

/// `_autoguard.<firstLabel>` qualified with the parent domain if any.
pub fn txt_record_name(custom_domain: &str) -> String {
    match custom_domain.split_once('.') {
        Some((first_label, parent)) => format!("_autoguard.{first_label}.{parent}"),
        None => format!("_autoguard.{custom_domain}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_derivation_is_deterministic() {
        let a = derive_token("acme");
        let b = derive_token("acme");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn different_subdomains_derive_different_tokens() {
        assert_ne!(derive_token("acme"), derive_token("beta"));
    }

    #[test]
    fn token_never_contains_base64_padding_or_slashes() {
        for subdomain in ["a", "ab", "abc", "offer-with-dashes", "a1b2c3d4e5f6g7"] {
            let token = derive_token(subdomain);
            assert!(!token.contains('+'));
            assert!(!token.contains('/'));
            assert!(!token.contains('='));
        }
    }

    #[test]
    fn txt_record_name_qualifies_with_parent_domain() {
        assert_eq!(txt_record_name("shop.acme.com"), "_autoguard.shop.acme.com");
        assert_eq!(txt_record_name("localhost"), "_autoguard.localhost");
    }

    #[test]
    fn txt_record_value_has_the_documented_literal_prefix() {
        assert_eq!(txt_record_value("abc123"), "ag-verify=abc123");
    }
}
