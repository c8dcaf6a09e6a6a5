//! Provider error types

use thiserror::Error;

/// Why a provider fetch produced no references.
///
/// These never reach resolver callers; the resolver logs them and degrades to
/// an empty result.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status code.
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    /// Body was not the JSON shape we expect.
    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body parsed but the field we need was absent.
    #[error("provider response missing field `{0}`")]
    MissingField(&'static str),

    /// Legacy API reported a non-OK status inside a 200 body.
    #[error("provider status {status}: {message}")]
    Provider { status: String, message: String },

    /// Endpoint configuration could not be turned into a request URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

impl FetchError {
    /// Short label used as a metric/log dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http(e) if e.is_timeout() => "timeout",
            FetchError::Http(_) => "http",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
            FetchError::MissingField(_) => "missing_field",
            FetchError::Provider { .. } => "provider_status",
            FetchError::InvalidEndpoint(_) => "endpoint",
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
