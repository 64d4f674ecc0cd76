//! Close status codes and close-frame payload handling.

use std::fmt;

use thiserror::Error;

/// Status code carried by a CLOSE frame.
///
/// A newtype rather than an enum: peers may send application-defined codes
/// in the 3000-4999 range which must round-trip unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: Self = Self(1000);
    /// Endpoint is going away.
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error.
    pub const PROTOCOL: Self = Self(1002);
    /// Unsupported data type.
    pub const UNSUPPORTED: Self = Self(1003);
    /// No status present in the close frame. Never sent on the wire.
    pub const NO_STATUS: Self = Self(1005);
    /// Abnormal closure. Never sent on the wire.
    pub const ABNORMAL: Self = Self(1006);
    /// Payload inconsistent with the message type (for example bad UTF-8).
    pub const INVALID_PAYLOAD: Self = Self(1007);
    /// Policy violation; the generic failure code for client-role endpoints.
    pub const POLICY_VIOLATION: Self = Self(1008);
    /// Message too big to process.
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// Unexpected condition on the server.
    pub const SERVER_ERROR: Self = Self(1011);

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 { self.0 }

    /// Whether the code may appear in a CLOSE frame sent by an endpoint.
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self.0, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }
}

impl From<u16> for CloseCode {
    fn from(value: u16) -> Self { Self(value) }
}

impl From<CloseCode> for u16 {
    fn from(value: CloseCode) -> Self { value.0 }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Errors raised while decoding a CLOSE payload.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CloseInfoError {
    /// A one-byte payload cannot hold a status code.
    #[error("close payload of 1 byte cannot carry a status code")]
    TruncatedStatus,
    /// The reason text is not valid UTF-8.
    #[error("close reason is not valid UTF-8")]
    InvalidReason,
}

impl CloseInfoError {
    /// Status the endpoint should answer with when this error occurs.
    #[must_use]
    pub const fn close_code(self) -> CloseCode {
        match self {
            Self::TruncatedStatus => CloseCode::PROTOCOL,
            Self::InvalidReason => CloseCode::INVALID_PAYLOAD,
        }
    }
}

/// Status and reason decoded from a CLOSE frame.
///
/// ```
/// use wsdriver::close::{CloseCode, CloseInfo};
///
/// let info = CloseInfo::from_payload(&[0x03, 0xE8, b'b', b'y', b'e']).expect("valid payload");
/// assert_eq!(info.code(), CloseCode::NORMAL);
/// assert_eq!(info.reason(), Some("bye"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseInfo {
    code: CloseCode,
    reason: Option<String>,
}

impl CloseInfo {
    /// Build close information from parts.
    #[must_use]
    pub fn new(code: CloseCode, reason: Option<String>) -> Self { Self { code, reason } }

    /// Decode a CLOSE payload: a big-endian status code followed by an
    /// optional UTF-8 reason. An empty payload yields [`CloseCode::NO_STATUS`].
    ///
    /// # Errors
    ///
    /// Returns [`CloseInfoError`] when the payload is one byte long or the
    /// reason is not UTF-8.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CloseInfoError> {
        match payload {
            [] => Ok(Self::new(CloseCode::NO_STATUS, None)),
            [_] => Err(CloseInfoError::TruncatedStatus),
            [hi, lo, rest @ ..] => {
                let code = CloseCode(u16::from_be_bytes([*hi, *lo]));
                let reason = if rest.is_empty() {
                    None
                } else {
                    let text =
                        std::str::from_utf8(rest).map_err(|_| CloseInfoError::InvalidReason)?;
                    Some(text.to_owned())
                };
                Ok(Self::new(code, reason))
            }
        }
    }

    /// Status code.
    #[must_use]
    pub const fn code(&self) -> CloseCode { self.code }

    /// Reason text, if the peer sent one.
    #[must_use]
    pub fn reason(&self) -> Option<&str> { self.reason.as_deref() }
}

/// An explicit request to close the connection with a specific status.
///
/// Raised by validation elsewhere in the stack, or returned from an
/// application callback, when the endpoint must close with a particular code
/// rather than the generic role-based failure status.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("close requested with status {code}: {reason}")]
pub struct CloseException {
    code: CloseCode,
    reason: String,
}

impl CloseException {
    /// Request a close with `code` and `reason`.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Requested status code.
    #[must_use]
    pub const fn code(&self) -> CloseCode { self.code }

    /// Requested reason text.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_payload_reports_no_status() {
        let info = CloseInfo::from_payload(&[]).expect("empty payload is valid");
        assert_eq!(info.code(), CloseCode::NO_STATUS);
        assert_eq!(info.reason(), None);
    }

    #[test]
    fn status_without_reason() {
        let info = CloseInfo::from_payload(&[0x03, 0xF3]).expect("status only");
        assert_eq!(info.code(), CloseCode::SERVER_ERROR);
        assert_eq!(info.reason(), None);
    }

    #[rstest]
    #[case(&[0x03], CloseInfoError::TruncatedStatus, CloseCode::PROTOCOL)]
    #[case(&[0x03, 0xE8, 0xFF, 0xFE], CloseInfoError::InvalidReason, CloseCode::INVALID_PAYLOAD)]
    fn malformed_payloads_are_rejected(
        #[case] payload: &[u8],
        #[case] expected: CloseInfoError,
        #[case] code: CloseCode,
    ) {
        let err = CloseInfo::from_payload(payload).expect_err("payload must be rejected");
        assert_eq!(err, expected);
        assert_eq!(err.close_code(), code);
    }

    #[rstest]
    #[case(1000, true)]
    #[case(1005, false)]
    #[case(1006, false)]
    #[case(1011, true)]
    #[case(4000, true)]
    #[case(999, false)]
    fn sendable_codes(#[case] raw: u16, #[case] sendable: bool) {
        assert_eq!(CloseCode(raw).is_sendable(), sendable);
    }
}
