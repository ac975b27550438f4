//! Response and callback templating.

pub mod faker;
pub mod placeholder;
pub mod render;
pub mod variables;

use crate::predicate::RequestContext;
use rand::Rng;
use serde_json::Value;

pub use placeholder::{has_placeholders, Placeholder};
pub use render::{render, render_string, render_text, Resolver, Verbatim, MAX_REPEAT};
pub use variables::{ResponseContext, VariableResolver};

/// Resolver for mock response bodies: request variables plus faker data.
///
/// Accepts `{{faker.module.method}}` and the bare `{{module.method}}` form.
pub struct BodyResolver<'a, R: Rng + ?Sized> {
    variables: VariableResolver<'a>,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> BodyResolver<'a, R> {
    pub fn new(request: &'a RequestContext, rng: &'a mut R) -> Self {
        Self {
            variables: VariableResolver::request_only(request),
            rng,
        }
    }
}

impl<R: Rng + ?Sized> Resolver for BodyResolver<'_, R> {
    fn resolve(&mut self, placeholder: &Placeholder<'_>) -> Option<Value> {
        let segments = placeholder.segments();
        if let Some(value) = self.variables.resolve_path(&segments) {
            return Some(value);
        }

        let generator = match segments.as_slice() {
            ["faker", module, method] | [module, method] => (*module, *method),
            _ => return None,
        };
        faker::generate(generator.0, generator.1, &placeholder.options(), &mut *self.rng)
    }
}

/// Render a mock body. With `use_faker` off the template is returned as
/// written, except that `_repeat_N` keys still expand.
pub fn render_mock_body<R: Rng + ?Sized>(
    template: &Value,
    use_faker: bool,
    request: &RequestContext,
    rng: &mut R,
) -> Value {
    if use_faker {
        render(template, &mut BodyResolver::new(request, rng))
    } else {
        render(template, &mut Verbatim)
    }
}
