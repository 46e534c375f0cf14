//! HTTP protocol layer module
//!
//! Response construction shared by the router and the echo handler.

pub mod response;

// Re-export commonly used builders
pub use response::{build_400_response, build_404_response, build_413_response, build_text_response};
