//! Response construction: body plumbing and mock response synthesis.

pub mod body;
pub mod synth;

pub use body::{
    empty_body, error_response, full_body, json_response, not_found, tracked, MockResponseBuilder,
    ResponseBody,
};
pub use synth::{merge_headers, synthesize, ResponseSpec, SynthesizedResponse};
