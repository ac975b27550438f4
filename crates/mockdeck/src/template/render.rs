//! Tree-walking template renderer.

use super::placeholder::{has_placeholders, replace_all, whole, Placeholder};
use crate::predicate::condition::coerce_string;
use serde_json::{Map, Value};

/// Upper bound on items produced by one `_repeat_N` key.
pub const MAX_REPEAT: usize = 1000;

/// Supplies values for placeholders.
pub trait Resolver {
    /// `None` leaves the placeholder text as written.
    fn resolve(&mut self, placeholder: &Placeholder<'_>) -> Option<Value>;
}

/// Resolves nothing; templates come back unchanged apart from `_repeat_N`.
pub struct Verbatim;

impl Resolver for Verbatim {
    fn resolve(&mut self, _placeholder: &Placeholder<'_>) -> Option<Value> {
        None
    }
}

/// Render a JSON template.
///
/// A string that is exactly one placeholder becomes the resolved value with
/// its JSON type; placeholders embedded in longer strings are substituted as
/// text (`null` as empty). An object holding a `_repeat_N` key becomes an
/// array of `N` independently rendered items: the key's value when it is the
/// only key, otherwise the rest of the object.
pub fn render<R: Resolver + ?Sized>(template: &Value, resolver: &mut R) -> Value {
    match template {
        Value::String(s) => render_string(s, resolver),
        Value::Array(items) => Value::Array(items.iter().map(|i| render(i, resolver)).collect()),
        Value::Object(map) => render_object(map, resolver),
        other => other.clone(),
    }
}

pub fn render_string<R: Resolver + ?Sized>(text: &str, resolver: &mut R) -> Value {
    if let Some(placeholder) = whole(text) {
        return resolver
            .resolve(&placeholder)
            .unwrap_or_else(|| Value::String(text.to_string()));
    }
    if !has_placeholders(text) {
        return Value::String(text.to_string());
    }
    Value::String(replace_all(text, |p| {
        resolver.resolve(p).map(|v| coerce_string(&v))
    }))
}

/// Render to plain text, e.g. for header values and URLs.
pub fn render_text<R: Resolver + ?Sized>(text: &str, resolver: &mut R) -> String {
    coerce_string(&render_string(text, resolver))
}

fn render_object<R: Resolver + ?Sized>(map: &Map<String, Value>, resolver: &mut R) -> Value {
    let repeat = map
        .iter()
        .find_map(|(key, value)| repeat_count(key).map(|n| (key, value, n)));

    if let Some((key, value, count)) = repeat {
        let rest;
        let item = if map.len() == 1 {
            value
        } else {
            let mut siblings = map.clone();
            siblings.remove(key);
            rest = Value::Object(siblings);
            &rest
        };
        return Value::Array((0..count).map(|_| render(item, resolver)).collect());
    }

    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), render(value, resolver)))
            .collect(),
    )
}

/// `_repeat_3` -> 3, capped at [`MAX_REPEAT`].
pub fn repeat_count(key: &str) -> Option<usize> {
    key.strip_prefix("_repeat_")?
        .parse::<usize>()
        .ok()
        .map(|n| n.min(MAX_REPEAT))
}
