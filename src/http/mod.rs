//! HTTP protocol layer module
//!
//! Response builders and query parsing, decoupled from the endpoints that use them.

pub mod query;
pub mod response;

// Re-export commonly used items
pub use response::{
    build_404_response, build_405_response, build_413_response, build_error_response,
    build_json_response, build_options_response, strip_body, with_server_header,
};
