//! Error classification.
//!
//! Transport failures are reduced to a closed set of [`ErrorKind`]s, each with
//! a fixed message, and attached to the part of the client state the user is
//! looking at: a form field, the begin-session form as a whole, or the
//! conversation.

use std::fmt;

use crate::error::Error;

const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

///////////////////////////////////////// TransportFailure /////////////////////////////////////////

/// What the classifier gets to see of a failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// HTTP status code.
    pub status_code: u16,
    /// The `type` field of the error body, if any.
    pub body_type: Option<String>,
}

impl TransportFailure {
    /// Create a new failure descriptor.
    pub fn new(status_code: u16, body_type: Option<String>) -> Self {
        Self {
            status_code,
            body_type,
        }
    }
}

//////////////////////////////////////////// ErrorKind /////////////////////////////////////////////

/// The user-facing classes of exchange failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The passphrase was rejected.
    Unauthorized,
    /// The agent's upstream model provider is out of quota.
    QuotaExceeded,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// The fixed message shown for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Incorrect passphrase",
            ErrorKind::QuotaExceeded => {
                "Insufficient OpenAI quota. Please try again after purchasing more credits."
            }
            ErrorKind::Unknown => "Something went wrong. Please try again later.",
        }
    }

    /// Where an error of this kind attaches for the given exchange.
    ///
    /// Only a rejected passphrase during begin-session has a field to point
    /// at; everything else lands in the slot of the exchange's context.
    pub fn target(self, exchange: Exchange) -> ErrorTarget {
        match (self, exchange) {
            (ErrorKind::Unauthorized, Exchange::BeginSession) => {
                ErrorTarget::Field(FormField::Passphrase)
            }
            (_, Exchange::BeginSession) => ErrorTarget::Form,
            (_, Exchange::SendMessage) => ErrorTarget::Conversation,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Classify a transport failure.
///
/// First match wins: 401 is `Unauthorized`; 429 with an
/// `insufficient_quota` body is `QuotaExceeded`; the rest is `Unknown`.
pub fn classify(failure: &TransportFailure) -> ErrorKind {
    match (failure.status_code, failure.body_type.as_deref()) {
        (401, _) => ErrorKind::Unauthorized,
        (429, Some(INSUFFICIENT_QUOTA)) => ErrorKind::QuotaExceeded,
        _ => ErrorKind::Unknown,
    }
}

/// Classify any error returned by a transport.
///
/// Errors that never produced an HTTP status (timeouts, refused connections,
/// undecodable bodies) are `Unknown`.
pub fn classify_error(err: &Error) -> ErrorKind {
    err.transport_failure()
        .map(|failure| classify(&failure))
        .unwrap_or(ErrorKind::Unknown)
}

///////////////////////////////////////////// Targets //////////////////////////////////////////////

/// The two exchange shapes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// Creating a session from a URL and passphrase.
    BeginSession,
    /// Sending a human turn in an active session.
    SendMessage,
}

/// Input fields an error can point at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FormField {
    /// The begin-session URL.
    Url,
    /// The begin-session passphrase.
    Passphrase,
    /// The free-text message box.
    Message,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormField::Url => write!(f, "url"),
            FormField::Passphrase => write!(f, "passphrase"),
            FormField::Message => write!(f, "message"),
        }
    }
}

/// Where an error is shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorTarget {
    /// A single input field.
    Field(FormField),
    /// The begin-session form as a whole.
    Form,
    /// The active conversation.
    Conversation,
}

/// Why an error was attached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Cause {
    /// Local validation rejected the input; no request was sent.
    Validation,
    /// The transport failed and the failure was classified.
    Classified(ErrorKind),
}

/// An error value attached to client state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedError {
    /// Where the error is shown.
    pub target: ErrorTarget,
    /// What produced it.
    pub cause: Cause,
    /// The message to show.
    pub message: String,
}

impl AttachedError {
    /// Attach a local validation failure to a field.
    pub fn validation(field: FormField, message: impl Into<String>) -> Self {
        Self {
            target: ErrorTarget::Field(field),
            cause: Cause::Validation,
            message: message.into(),
        }
    }

    /// Classify a transport error and attach it for the given exchange.
    pub fn classified(exchange: Exchange, err: &Error) -> Self {
        let kind = classify_error(err);
        Self {
            target: kind.target(exchange),
            cause: Cause::Classified(kind),
            message: kind.message().to_string(),
        }
    }

    /// The classified kind, if this did not come from validation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self.cause {
            Cause::Classified(kind) => Some(kind),
            Cause::Validation => None,
        }
    }
}

impl fmt::Display for AttachedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            ErrorTarget::Field(field) => write!(f, "{field}: {}", self.message),
            ErrorTarget::Form | ErrorTarget::Conversation => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn failure(status_code: u16, body_type: Option<&str>) -> TransportFailure {
        TransportFailure::new(status_code, body_type.map(String::from))
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(&failure(401, None)), ErrorKind::Unauthorized);
        assert_eq!(
            classify(&failure(401, Some("insufficient_quota"))),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            classify(&failure(429, Some("insufficient_quota"))),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(classify(&failure(429, Some("other"))), ErrorKind::Unknown);
        assert_eq!(classify(&failure(429, None)), ErrorKind::Unknown);
        assert_eq!(classify(&failure(500, None)), ErrorKind::Unknown);
        assert_eq!(
            classify(&failure(500, Some("insufficient_quota"))),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn non_http_errors_are_unknown() {
        assert_eq!(
            classify_error(&Error::timeout("slow", None)),
            ErrorKind::Unknown
        );
        assert_eq!(
            classify_error(&Error::connection("refused", None)),
            ErrorKind::Unknown
        );
        assert_eq!(
            classify_error(&Error::api(401, None, "Unauthorized access")),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn unauthorized_targets_passphrase_only_when_beginning() {
        assert_eq!(
            ErrorKind::Unauthorized.target(Exchange::BeginSession),
            ErrorTarget::Field(FormField::Passphrase)
        );
        assert_eq!(
            ErrorKind::Unauthorized.target(Exchange::SendMessage),
            ErrorTarget::Conversation
        );
        assert_eq!(
            ErrorKind::QuotaExceeded.target(Exchange::BeginSession),
            ErrorTarget::Form
        );
        assert_eq!(
            ErrorKind::Unknown.target(Exchange::SendMessage),
            ErrorTarget::Conversation
        );
    }

    #[test]
    fn attached_error_carries_fixed_message() {
        let err = Error::api(429, Some("insufficient_quota".to_string()), "quota");
        let attached = AttachedError::classified(Exchange::SendMessage, &err);
        assert_eq!(attached.kind(), Some(ErrorKind::QuotaExceeded));
        assert_eq!(attached.target, ErrorTarget::Conversation);
        assert_eq!(attached.message, ErrorKind::QuotaExceeded.message());
    }

    proptest! {
        #[test]
        fn classification_is_total_and_deterministic(
            status in any::<u16>(),
            body_type in proptest::option::of("[a-z_]{0,24}"),
        ) {
            let failure = TransportFailure::new(status, body_type.clone());
            let first = classify(&failure);
            prop_assert_eq!(first, classify(&failure));
            let expected = match (status, body_type.as_deref()) {
                (401, _) => ErrorKind::Unauthorized,
                (429, Some("insufficient_quota")) => ErrorKind::QuotaExceeded,
                _ => ErrorKind::Unknown,
            };
            prop_assert_eq!(first, expected);
        }
    }
}
