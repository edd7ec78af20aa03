//! Request extractors that reject with the API's structured error body.

mod json;
mod path_id;

pub use json::ApiJson;
pub use path_id::PathId;
