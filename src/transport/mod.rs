//! Transport layer implementations
//!
//! The photo service is reachable over HTTP/JSON; the CLI binary calls the
//! service directly.

pub mod http;

pub use http::HttpTransport;
