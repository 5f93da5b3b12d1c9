//! Client Module
//!
//! Upstream call capability and its HTTP implementation.

pub mod http;
pub mod upstream;

pub use http::HttpUpstream;
pub use upstream::{UpstreamClient, UpstreamError, UpstreamReply};
