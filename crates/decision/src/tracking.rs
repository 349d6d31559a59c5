use crate::types::TrackingParams;

/// Extracts the documented tracking parameters from a request URL's
/// query string. Unknown parameters are ignored; a malformed URL
/// (no `?`, or unparseable) yields an all-`None` result rather than
/// an error — tracking-param absence is never fatal to `decide`.
pub fn parse(url: &str) -> TrackingParams {
    let mut params = TrackingParams::default();
    let Some((_, query)) = url.split_once('?') else {
        return params;
    };

    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let value = percent_decode(value);
        match key {
            "gclid" => params.gclid = Some(value),
            "fbclid" => params.fbclid = Some(value),
            "msclkid" => params.msclkid = Some(value),
            "ttclid" => params.ttclid = Some(value),
            "twclid" => params.twclid = Some(value),
            "utm_source" => params.utm_source = Some(value),
            "utm_medium" => params.utm_medium = Some(value),
            "utm_campaign" => params.utm_campaign = Some(value),
            "utm_term" => params.utm_term = Some(value),
            "utm_content" => params.utm_content = Some(value),
            "ref" => params.referrer_tag = Some(value),
            "affiliate_id" => params.affiliate_id = Some(value),
            "click_id" => params.click_id = Some(value),
            _ => {}
        }
    }
    params
}

/// Minimal `%XX` decoder for query values — no crate pulled in for this
/// since the alphabet of characters we round-trip (click ids, utm
/// tags) never needs full RFC 3986 reserved-character handling.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_click_ids_and_utm_tags() {
        let p = parse("https://example.com/?gclid=abc123&utm_source=google&utm_medium=cpc");
        assert_eq!(p.gclid.as_deref(), Some("abc123"));
        assert_eq!(p.utm_source.as_deref(), Some("google"));
        assert!(p.has_tracking_params());
    }

    #[test]
    fn no_query_string_means_no_tracking_params() {
        let p = parse("https://example.com/landing");
        assert!(!p.has_tracking_params());
    }

    #[test]
    fn decodes_percent_and_plus_encoding() {
        let p = parse("https://example.com/?ref=a%20b+c");
        assert_eq!(p.referrer_tag.as_deref(), Some("a b c"));
    }

    #[test]
    fn utm_only_does_not_count_as_tracking_param() {
        let p = parse("https://example.com/?utm_source=newsletter");
        assert!(!p.has_tracking_params());
    }
}
