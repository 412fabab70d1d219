//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from specific business logic:
//! the streaming body, MIME lookup, cache headers and response builders.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::{BodyOutcome, BodyState, ResponseBody};
pub use mime::MimeTable;
pub use response::{build_empty_response, build_streaming_response, build_text_response};
