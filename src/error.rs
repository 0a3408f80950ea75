use std::sync::Arc;

/// Represents a result type for operations in the decisioning core.
///
/// This `Result` type is a standard Rust `Result` type where the error
/// variant is defined by the crate-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the decisioning core.
///
/// Enrichment errors never abort a serving request: the signal collector
/// degrades to signal-absence and the selector cannot fail. These variants
/// exist for the resolver layer and for hosts that call resolvers directly.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A lookup was skipped or failed. Raised when the service's circuit
    /// breaker is open, or when the producer failed on this attempt.
    #[error("{service} lookup unavailable")]
    Unavailable {
        /// Service name, `"geo"` or `"weather"`.
        service: &'static str,
    },

    /// The provider answered, but the body is unusable (e.g. a non-success
    /// status payload). Counts as a lookup failure for the circuit breaker.
    #[error("{service} provider returned an unusable response")]
    MalformedResponse {
        /// Service name, `"geo"` or `"weather"`.
        service: &'static str,
    },

    /// Invalid base_url configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Network error.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
