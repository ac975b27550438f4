//! `{{request.*}}` and `{{response.*}}` variables.

use super::placeholder::Placeholder;
use super::render::Resolver;
use crate::predicate::{walk, RequestContext};
use serde_json::Value;
use std::collections::HashMap;

/// What the client was sent, as seen by callbacks.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    pub status_code: u16,
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl ResponseContext {
    pub fn lookup(&self, path: &[&str]) -> Option<Value> {
        match path {
            ["statusCode" | "status"] => Some(Value::from(self.status_code)),
            ["headers" | "header", rest @ ..] if !rest.is_empty() => self
                .headers
                .get(&rest.join(".").to_lowercase())
                .map(|v| Value::String(v.clone())),
            ["body", rest @ ..] => walk(&self.body, rest).cloned(),
            _ => None,
        }
    }
}

/// Resolves request (and optionally response) variables. Anything else,
/// including faker placeholders, is left literal.
///
/// A variable that names a missing field resolves to `null`, which renders
/// as empty text inside a longer string.
pub struct VariableResolver<'a> {
    request: &'a RequestContext,
    response: Option<&'a ResponseContext>,
}

impl<'a> VariableResolver<'a> {
    pub fn request_only(request: &'a RequestContext) -> Self {
        Self {
            request,
            response: None,
        }
    }

    pub fn with_response(request: &'a RequestContext, response: &'a ResponseContext) -> Self {
        Self {
            request,
            response: Some(response),
        }
    }

    pub(crate) fn resolve_path(&self, segments: &[&str]) -> Option<Value> {
        match segments {
            ["request", rest @ ..] if !rest.is_empty() => {
                Some(self.request.lookup(&rest.join(".")).unwrap_or(Value::Null))
            }
            ["response", rest @ ..] if !rest.is_empty() => {
                let response = self.response?;
                Some(response.lookup(rest).unwrap_or(Value::Null))
            }
            _ => None,
        }
    }
}

impl Resolver for VariableResolver<'_> {
    fn resolve(&mut self, placeholder: &Placeholder<'_>) -> Option<Value> {
        self.resolve_path(&placeholder.segments())
    }
}
