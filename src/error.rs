//! Error types for the clerk client.
//!
//! This module defines the error type shared by the transport, the session
//! state machine, the persistence gateway and the exchange orchestrator.
//! Transport errors are later reduced to a small set of user-facing kinds by
//! [`crate::classify`]; the variants here keep the full detail.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::classify::{FormField, TransportFailure};

/// The main error type for the clerk client.
#[derive(Clone, Debug)]
pub enum Error {
    /// The agent backend answered with a non-success HTTP status.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// The `type` field of the error body, if the body carried one.
        error_type: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// Local validation rejected the input before any network call.
    Validation {
        /// Human-readable error message.
        message: String,
        /// The input field the error belongs to.
        field: Option<FormField>,
    },

    /// A session transition was requested from a state that does not allow it.
    InvalidTransition {
        /// Human-readable error message.
        message: String,
    },

    /// Another exchange is already outstanding on this conversation.
    AlreadyInFlight,

    /// The request timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Unknown error.
    Unknown {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, error_type: Option<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, field: Option<FormField>) -> Self {
        Error::Validation {
            message: message.into(),
            field,
        }
    }

    /// Creates a new invalid transition error.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Error::InvalidTransition {
            message: message.into(),
        }
    }

    /// Creates a new already-in-flight error.
    pub fn already_in_flight() -> Self {
        Error::AlreadyInFlight
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error is an invalid session transition.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Error::InvalidTransition { .. })
    }

    /// Returns true if this error is a rejected overlapping exchange.
    pub fn is_already_in_flight(&self) -> bool {
        matches!(self, Error::AlreadyInFlight)
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the `{status, body type}` descriptor of an HTTP failure.
    ///
    /// Only [`Error::Api`] carries one; every other error happened before a
    /// status line was received.
    pub fn transport_failure(&self) -> Option<TransportFailure> {
        match self {
            Error::Api {
                status_code,
                error_type,
                ..
            } => Some(TransportFailure::new(*status_code, error_type.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                error_type,
                message,
            } => {
                if let Some(error_type) = error_type {
                    write!(f, "{error_type} ({status_code}): {message}")
                } else {
                    write!(f, "API error ({status_code}): {message}")
                }
            }
            Error::Validation { message, field } => {
                if let Some(field) = field {
                    write!(f, "Validation error: {message} (field: {field})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::InvalidTransition { message } => {
                write!(f, "Invalid session transition: {message}")
            }
            Error::AlreadyInFlight => {
                write!(f, "An exchange is already in flight")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Unknown { message } => {
                write!(f, "Unknown error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for clerk operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_failure_descriptor() {
        let err = Error::api(429, Some("insufficient_quota".to_string()), "quota");
        let failure = err.transport_failure().unwrap();
        assert_eq!(failure.status_code, 429);
        assert_eq!(failure.body_type.as_deref(), Some("insufficient_quota"));
        assert_eq!(err.status_code(), Some(429));
    }

    #[test]
    fn local_errors_have_no_failure_descriptor() {
        assert!(Error::timeout("slow", Some(60.0)).transport_failure().is_none());
        assert!(Error::connection("refused", None).transport_failure().is_none());
        assert!(Error::already_in_flight().transport_failure().is_none());
    }

    #[test]
    fn display() {
        let err = Error::api(401, None, "Unauthorized access");
        assert_eq!(err.to_string(), "API error (401): Unauthorized access");

        let err = Error::validation("Passphrase is required", Some(FormField::Passphrase));
        assert_eq!(
            err.to_string(),
            "Validation error: Passphrase is required (field: passphrase)"
        );

        let err = Error::invalid_transition("session already active");
        assert_eq!(
            err.to_string(),
            "Invalid session transition: session already active"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(error::Error::source(&err).is_some());
    }
}
