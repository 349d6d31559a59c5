//! A deliberately small `{{var}}` / `{{#section}}…{{/section}}`
//! template renderer for AI safe-page generation prompts and the fixed
//! HTML shell. No templating crate is pulled in for this — the grammar
//! is two constructs, and Rust's `regex` crate can't express the
//! backreference a generic `{{#name}}…{{/name}}` matcher would need
//! anyway, so a small hand-written scanner is the natural fit.
//!
//! `{{#section}}…{{/section}}` is stripped entirely when `section` is
//! absent from `vars` or maps to an empty string; otherwise the inner
//! content is kept (and itself scanned for `{{var}}` substitutions).
//! Every `{{var}}` occurrence is replaced globally; an unknown variable
//! is replaced with the empty string.

use std::collections::HashMap;

pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let with_sections_resolved = strip_sections(template, vars);
    substitute_variables(&with_sections_resolved, vars)
}

fn strip_sections(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open_start) = rest.find("{{#") {
        out.push_str(&rest[..open_start]);
        let after_hash = &rest[open_start + 3..];
        let Some(name_end) = after_hash.find("}}") else {
            // Malformed — no closing `}}` for the opener; emit verbatim.
            out.push_str(&rest[open_start..]);
            rest = "";
            break;
        };
        let name = &after_hash[..name_end];
        let close_tag = format!("{{{{/{name}}}}}");
        let body_start = open_start + 3 + name_end + 2;
        let Some(close_rel) = rest[body_start..].find(&close_tag) else {
            // No matching close tag — treat the rest as literal.
            out.push_str(&rest[open_start..]);
            rest = "";
            break;
        };
        let body = &rest[body_start..body_start + close_rel];
        let keep = vars.get(name).is_some_and(|v| !v.is_empty());
        if keep {
            out.push_str(&strip_sections(body, vars));
        }
        rest = &rest[body_start + close_rel + close_tag.len()..];
    }
    out.push_str(rest);
    out
}

fn substitute_variables(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close_rel) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = after_open[..close_rel].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => {}
        }
        rest = &after_open[close_rel + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_every_occurrence_of_a_variable() {
        let rendered = render("{{name}} loves {{name}}'s own product", &vars(&[("name", "Acme")]));
        assert_eq!(rendered, "Acme loves Acme's own product");
    }

    #[test]
    fn section_is_kept_when_variable_is_non_empty() {
        let template = "intro{{#cta_button}} <a>{{cta_button}}</a>{{/cta_button}}end";
        let rendered = render(template, &vars(&[("cta_button", "Buy now")]));
        assert_eq!(rendered, "intro <a>Buy now</a>end");
    }

    #[test]
    fn section_is_stripped_when_variable_is_absent_or_empty() {
        let template = "intro{{#cta_button}} <a>{{cta_button}}</a>{{/cta_button}}end";
        assert_eq!(render(template, &vars(&[])), "introend");
        assert_eq!(render(template, &vars(&[("cta_button", "")])), "introend");
    }

    #[test]
    fn unknown_variable_renders_as_empty_string() {
        assert_eq!(render("hello {{unknown}}!", &vars(&[])), "hello !");
    }
}
