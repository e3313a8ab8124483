//! Request handler module
//!
//! The four demo endpoints and the dispatcher in front of them.

pub mod calc;
pub mod probes;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
