//! Canonical error types for frame dispatch.
//!
//! Every failure raised while a frame is dispatched becomes a
//! [`DispatchError`]. The driver matches on it exhaustively to choose the
//! close status sent to the peer; nothing escapes `on_frame`.

use std::{error::Error as StdError, fmt};

use thiserror::Error;

use crate::{
    close::{CloseCode, CloseException, CloseInfoError},
    frame::{MessageFamily, OpCode},
    policy::Behavior,
};

/// Failure returned by an application callback.
///
/// Any `std::error::Error` converts into a `HandlerFailure` with `?`, which
/// records the source's type name so termination can report it without
/// leaking the error message onto the wire. Returning a
/// [`CloseException`] requests a close with that exact status.
///
/// ```
/// use wsdriver::error::HandlerFailure;
///
/// fn parse(input: &str) -> Result<u32, HandlerFailure> { Ok(input.parse::<u32>()?) }
///
/// let failure = parse("nope").expect_err("not a number");
/// assert_eq!(failure.type_name(), "ParseIntError");
/// ```
pub struct HandlerFailure {
    type_name: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl HandlerFailure {
    /// Wrap an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            type_name: short_type_name(std::any::type_name::<E>()),
            source: Box::new(error),
        }
    }

    /// Failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            type_name: "HandlerFailure",
            source: message.into(),
        }
    }

    /// Short name of the wrapped error's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str { self.type_name }

    /// Borrow the wrapped error.
    #[must_use]
    pub fn source(&self) -> &(dyn StdError + Send + Sync + 'static) { self.source.as_ref() }

    /// Attempt to view the wrapped error as `E`.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> { self.source.downcast_ref() }
}

impl<E> From<E> for HandlerFailure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self { Self::new(error) }
}

impl fmt::Debug for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFailure")
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.source)
    }
}

/// Strip the module path and generic arguments from a type name.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Failures raised while dispatching a frame or lifecycle event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A buffered message outgrew its reassembly buffer.
    #[error("{family} message exceeds buffer: {attempted} bytes > {limit} bytes")]
    MessageTooLarge {
        /// Family of the oversized message.
        family: MessageFamily,
        /// Bytes the message would have held after the offending fragment.
        attempted: usize,
        /// Capacity of the reassembly buffer.
        limit: usize,
    },

    /// An explicit request to close with a specific status and reason.
    #[error(transparent)]
    ProtocolClose(#[from] CloseException),

    /// A buffered text message is not valid UTF-8.
    #[error("{family} message is not valid UTF-8")]
    InvalidUtf8 {
        /// Family of the rejected message.
        family: MessageFamily,
    },

    /// A CLOSE frame carried a malformed payload.
    #[error("malformed close frame: {0}")]
    InvalidClosePayload(#[from] CloseInfoError),

    /// A data frame of one family arrived while the other was in flight.
    #[error("{received} frame received while a {in_flight} message is incomplete")]
    UnexpectedDataFrame {
        /// Family of the message being assembled.
        in_flight: MessageFamily,
        /// Opcode of the offending frame.
        received: OpCode,
    },

    /// An application callback returned an error.
    #[error("handler failed: {0}")]
    Handler(HandlerFailure),

    /// An application callback panicked.
    #[error("handler panicked: {message}")]
    Panic {
        /// Formatted panic payload.
        message: String,
    },
}

impl From<HandlerFailure> for DispatchError {
    fn from(failure: HandlerFailure) -> Self {
        match failure.downcast_ref::<CloseException>() {
            Some(close) => Self::ProtocolClose(close.clone()),
            None => Self::Handler(failure),
        }
    }
}

impl DispatchError {
    /// Short name describing the failure kind.
    ///
    /// Used as the close reason for failures without an explicit status.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MessageTooLarge { .. } => "MessageTooLarge",
            Self::ProtocolClose(_) => "CloseException",
            Self::InvalidUtf8 { .. } => "InvalidUtf8",
            Self::InvalidClosePayload(_) => "InvalidClosePayload",
            Self::UnexpectedDataFrame { .. } => "UnexpectedDataFrame",
            Self::Handler(failure) => failure.type_name(),
            Self::Panic { .. } => "HandlerPanic",
        }
    }

    /// Close status and reason this failure produces for a given role.
    ///
    /// Explicit close requests keep their own status and reason; payload and
    /// framing violations close with their protocol status; every other
    /// failure maps to the role's generic failure status with the kind name
    /// as reason.
    #[must_use]
    pub fn close_status(&self, behavior: Behavior) -> (CloseCode, &str) {
        match self {
            Self::ProtocolClose(close) => (close.code(), close.reason()),
            Self::InvalidUtf8 { .. } => (CloseCode::INVALID_PAYLOAD, self.kind_name()),
            Self::InvalidClosePayload(error) => (error.close_code(), self.kind_name()),
            Self::UnexpectedDataFrame { .. } => (CloseCode::PROTOCOL, self.kind_name()),
            Self::MessageTooLarge { .. } | Self::Handler(_) | Self::Panic { .. } => {
                (behavior.failure_code(), self.kind_name())
            }
        }
    }
}

/// Result alias used by event-table callbacks.
pub type HandlerResult = std::result::Result<(), HandlerFailure>;

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::*;

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("my::Wrapper<alloc::string::String>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn close_exception_returned_by_handler_is_honoured() {
        let failure = HandlerFailure::from(CloseException::new(CloseCode(4000), "bye now"));
        let error = DispatchError::from(failure);
        assert!(matches!(error, DispatchError::ProtocolClose(_)));
        assert_eq!(
            error.close_status(Behavior::Server),
            (CloseCode(4000), "bye now")
        );
    }

    #[rstest]
    #[case(Behavior::Server, CloseCode::SERVER_ERROR)]
    #[case(Behavior::Client, CloseCode::POLICY_VIOLATION)]
    fn handler_errors_use_role_code_and_type_name(
        #[case] behavior: Behavior,
        #[case] expected: CloseCode,
    ) {
        let error = DispatchError::from(HandlerFailure::from(io::Error::other("secret detail")));
        let (code, reason) = error.close_status(behavior);
        assert_eq!(code, expected);
        assert_eq!(reason, "Error");
        assert!(!reason.contains("secret"));
    }

    #[test]
    fn message_too_large_uses_role_code() {
        let error = DispatchError::MessageTooLarge {
            family: MessageFamily::Text,
            attempted: 10,
            limit: 8,
        };
        assert_eq!(
            error.close_status(Behavior::Server),
            (CloseCode::SERVER_ERROR, "MessageTooLarge")
        );
    }

    #[rstest]
    #[case(CloseInfoError::TruncatedStatus, CloseCode::PROTOCOL)]
    #[case(CloseInfoError::InvalidReason, CloseCode::INVALID_PAYLOAD)]
    fn malformed_close_payload_maps_to_protocol_status(
        #[case] cause: CloseInfoError,
        #[case] expected: CloseCode,
    ) {
        let error = DispatchError::from(cause);
        assert_eq!(
            error.close_status(Behavior::Server),
            (expected, "InvalidClosePayload")
        );
    }

    #[test]
    fn unexpected_data_frame_is_a_protocol_error() {
        let error = DispatchError::UnexpectedDataFrame {
            in_flight: MessageFamily::Text,
            received: OpCode::Binary,
        };
        assert_eq!(
            error.close_status(Behavior::Client),
            (CloseCode::PROTOCOL, "UnexpectedDataFrame")
        );
    }
}
