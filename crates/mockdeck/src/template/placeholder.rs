//! `{{path}}` and `{{path({json options})}}` placeholder scanning.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

/// Matches `{{ module.method }}`, `{{faker.module.method({...})}}` and
/// `{{request.headers.x-api-key}}`.
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(
            r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_\-]+)+)\s*(?:\((.*?)\))?\s*\}\}",
        )
        .unwrap()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Dotted path, e.g. `faker.string.uuid` or `request.body.orderId`.
    pub path: &'a str,
    /// Raw text between the parentheses, if any.
    pub args: Option<&'a str>,
}

impl<'a> Placeholder<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        Some(Self {
            path: caps.get(1)?.as_str(),
            args: caps.get(2).map(|m| m.as_str()),
        })
    }

    pub fn segments(&self) -> Vec<&'a str> {
        self.path.split('.').collect()
    }

    /// Arguments parsed as JSON; empty or unparseable arguments give `Null`.
    pub fn options(&self) -> Value {
        self.args
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .and_then(|a| serde_json::from_str(a).ok())
            .unwrap_or(Value::Null)
    }
}

/// The placeholder, if `text` is exactly one with nothing around it.
pub fn whole(text: &str) -> Option<Placeholder<'_>> {
    let caps = placeholder_regex().captures(text)?;
    let m = caps.get(0)?;
    if m.start() != 0 || m.end() != text.len() {
        return None;
    }
    Placeholder::from_captures(&caps)
}

pub fn has_placeholders(text: &str) -> bool {
    text.contains("{{") && placeholder_regex().is_match(text)
}

/// Substitute every placeholder; `None` from `f` keeps the original text.
pub fn replace_all<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&Placeholder<'_>) -> Option<String>,
{
    placeholder_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            Placeholder::from_captures(caps)
                .and_then(|p| f(&p))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_placeholder() {
        let p = whole("{{faker.string.uuid}}").unwrap();
        assert_eq!(p.path, "faker.string.uuid");
        assert_eq!(p.args, None);

        let p = whole("{{ number.int({\"min\": 1, \"max\": 5}) }}").unwrap();
        assert_eq!(p.path, "number.int");
        assert_eq!(p.options(), json!({"min": 1, "max": 5}));

        assert!(whole("  {{string.uuid}} ").is_none());
        assert!(whole("id-{{string.uuid}}").is_none());
        assert!(whole("{{a.b}}{{c.d}}").is_none());
        assert!(whole("{{nodot}}").is_none());
    }

    #[test]
    fn test_replace_all_keeps_unresolved() {
        let out = replace_all("Hello {{person.firstName}}, {{unknown.thing}}!", |p| {
            (p.path == "person.firstName").then(|| "Ada".to_string())
        });
        assert_eq!(out, "Hello Ada, {{unknown.thing}}!");
    }

    #[test]
    fn test_header_names_with_dashes() {
        let p = whole("{{request.headers.x-api-key}}").unwrap();
        assert_eq!(p.segments(), vec!["request", "headers", "x-api-key"]);
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("a {{b.c}} d"));
        assert!(!has_placeholders("{{ not closed"));
        assert!(!has_placeholders("plain"));
    }
}
