// Error taxonomy shared by the retry engine and the lookup client

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single lookup attempt.
///
/// Every variant is reported to the retry engine as "this attempt failed";
/// [`LookupError::is_transient`] is only consulted when a custom retry
/// condition asks for it.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to create request for '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("response failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status code: {}", .status.as_u16())]
    UnexpectedStatus { status: StatusCode },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LookupError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures, 5xx, 408 and 429 responses and malformed bodies are
    /// transient. Other 4xx responses and malformed URLs are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::InvalidUrl { .. } => false,
            LookupError::Transport(_) => true,
            LookupError::UnexpectedStatus { status } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            LookupError::Decode(_) => true,
        }
    }
}

/// Terminal outcome of a retried operation that never succeeded.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The attempt budget was spent; carries the last failure.
    #[error("retries exhausted after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The cancellation token fired before any attempt succeeded.
    #[error("operation cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last_error: Option<E> },

    /// The retry condition rejected the failure, so no further attempt was made.
    #[error("non-retryable failure on attempt {attempts}: {source}")]
    Aborted {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts, .. }
            | RetryError::Aborted { attempts, .. } => *attempts,
        }
    }

    /// The last failure reported by the operation, if it ran at all.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Aborted { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Error returned by [`crate::client::PokeClient`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to fetch pokemon '{name}': {source}")]
    Pokemon {
        name: String,
        #[source]
        source: RetryError<LookupError>,
    },

    #[error("failed to fetch pokemon list: {source}")]
    PokemonList {
        #[source]
        source: RetryError<LookupError>,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl ClientError {
    fn retry_error(&self) -> Option<&RetryError<LookupError>> {
        match self {
            ClientError::Pokemon { source, .. } | ClientError::PokemonList { source } => {
                Some(source)
            }
            ClientError::HttpClient(_) => None,
        }
    }

    /// True when the call gave up because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.retry_error().is_some_and(RetryError::is_cancelled)
    }

    /// True when the call gave up because every attempt failed.
    pub fn is_exhausted(&self) -> bool {
        self.retry_error().is_some_and(RetryError::is_exhausted)
    }

    /// Number of HTTP attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        self.retry_error().map_or(0, RetryError::attempts)
    }

    /// The failure of the final attempt, if any attempt was made.
    pub fn last_lookup_error(&self) -> Option<&LookupError> {
        self.retry_error().and_then(RetryError::last_error)
    }
}

/// Invalid configuration values, either from the environment or a policy builder.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let status = |code: u16| LookupError::UnexpectedStatus {
            status: StatusCode::from_u16(code).unwrap(),
        };

        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(400).is_transient());

        let invalid = LookupError::InvalidUrl {
            url: "::".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(!invalid.is_transient());

        let decode = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(LookupError::from(decode).is_transient());
    }

    #[test]
    fn test_status_message_uses_numeric_code() {
        let err = LookupError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "unexpected status code: 404");
    }

    #[test]
    fn test_retry_error_accessors() {
        let exhausted: RetryError<&str> = RetryError::Exhausted {
            attempts: 3,
            source: "boom",
        };
        assert!(exhausted.is_exhausted());
        assert!(!exhausted.is_cancelled());
        assert_eq!(exhausted.attempts(), 3);
        assert_eq!(exhausted.last_error(), Some(&"boom"));

        let cancelled: RetryError<&str> = RetryError::Cancelled {
            attempts: 0,
            last_error: None,
        };
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.last_error(), None);
    }

    #[test]
    fn test_client_error_context() {
        let err = ClientError::Pokemon {
            name: "unknown".to_string(),
            source: RetryError::Exhausted {
                attempts: 3,
                source: LookupError::UnexpectedStatus {
                    status: StatusCode::NOT_FOUND,
                },
            },
        };

        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.to_string(),
            "failed to fetch pokemon 'unknown': retries exhausted after 3 attempt(s): unexpected status code: 404"
        );
    }
}
