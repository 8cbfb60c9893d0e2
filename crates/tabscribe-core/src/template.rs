//! `$name` / `${name}` placeholder substitution.
//!
//! Unknown placeholders and stray `$` are kept as literal text; `$$` renders a single `$`.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})")
            .expect("placeholder pattern")
    })
}

/// Substitutes every known placeholder, leaving the rest untouched.
pub fn safe_substitute(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.iter().find(|(k, _)| *k == name) {
                Some((_, v)) => v.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
