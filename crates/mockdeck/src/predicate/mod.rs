//! Request matching: condition evaluation and rule selection.

pub mod condition;
pub mod request;
pub mod selector;

pub use condition::{condition_matches, group_matches};
pub use request::{extract_path_params, parse_body, parse_query_string, walk, RequestContext};
pub use selector::select_rule;
