//! Error handling

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration; fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS, connect, read or timeout failure at the HTTP layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream returned a non-2xx status
    #[error("Upstream HTTP {status}: {body}")]
    UpstreamHttp {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// A 2xx response whose JSON did not match the expected schema
    #[error("Unexpected upstream response format: {0}")]
    UpstreamFormat(String),

    /// Upstream explicitly signalled 429
    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    /// Selection set is empty and the retry policy does not keep waiting
    #[error("No providers available")]
    NoProvidersAvailable,

    /// All validator retries consumed
    #[error("Validation retries exhausted: {reason}")]
    ValidationExhausted {
        /// Description of the last validation failure
        reason: String,
        /// The last reply that failed validation
        last_reply: String,
    },

    /// Caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Blocking entry point invoked from inside an async runtime
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Terminal failure after the retry budget was spent
    #[error("Request failed after {attempts} attempts (last provider: {provider}): {source}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Provider of record for the final attempt
        provider: String,
        /// The error from the final attempt
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether the retry loop may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::UpstreamHttp { .. }
                | Error::UpstreamFormat(_)
                | Error::RateLimited(_)
        )
    }

    /// The HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UpstreamHttp { status, .. } => Some(*status),
            Error::RateLimited(_) => Some(429),
            Error::Exhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;
