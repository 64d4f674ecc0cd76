//! Parsed WebSocket frames as delivered by the upstream parser.
//!
//! Wire decoding happens elsewhere; this module only models the structured
//! result: an [`OpCode`], the FIN flag and the (already unmasked) payload.

use std::fmt;

use bytes::Bytes;

/// Maximum payload carried by a control frame (RFC 6455 section 5.5).
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Frame opcodes understood by the event driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Continuation of a fragmented data message.
    Continuation,
    /// UTF-8 text data.
    Text,
    /// Binary data.
    Binary,
    /// Connection close.
    Close,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
}

impl OpCode {
    /// Map a raw 4-bit opcode value, returning `None` for reserved values.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    /// Raw opcode value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    /// Whether this opcode denotes a control frame.
    #[must_use]
    pub const fn is_control(self) -> bool { matches!(self, Self::Close | Self::Ping | Self::Pong) }

    /// Data family of the opcode, if it starts a data message.
    #[must_use]
    pub const fn family(self) -> Option<MessageFamily> {
        match self {
            Self::Text => Some(MessageFamily::Text),
            Self::Binary => Some(MessageFamily::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continuation => "CONTINUATION",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Close => "CLOSE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
        };
        f.write_str(name)
    }
}

/// The two data message families a session can assemble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    /// Messages started by a TEXT frame.
    Text,
    /// Messages started by a BINARY frame.
    Binary,
}

impl MessageFamily {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for MessageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A single parsed frame.
///
/// ```
/// use wsdriver::frame::{Frame, OpCode};
///
/// let frame = Frame::text("He").with_fin(false);
/// assert_eq!(frame.opcode(), OpCode::Text);
/// assert!(!frame.is_fin());
/// assert_eq!(frame.payload().as_ref(), b"He");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    opcode: OpCode,
    fin: bool,
    payload: Bytes,
}

impl Frame {
    /// Create a frame from its parts.
    #[must_use]
    pub fn new(opcode: OpCode, fin: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            fin,
            payload: payload.into(),
        }
    }

    /// Final TEXT frame carrying `text`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(OpCode::Text, true, Bytes::from(text.into()))
    }

    /// Final BINARY frame carrying `data`.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self { Self::new(OpCode::Binary, true, data) }

    /// Continuation frame carrying `data`.
    #[must_use]
    pub fn continuation(data: impl Into<Bytes>, fin: bool) -> Self {
        Self::new(OpCode::Continuation, fin, data)
    }

    /// CLOSE frame with the encoded status and reason.
    #[must_use]
    pub fn close(status: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&status.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::new(OpCode::Close, true, payload)
    }

    /// Override the FIN flag.
    #[must_use]
    pub fn with_fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Opcode of this frame.
    #[must_use]
    pub const fn opcode(&self) -> OpCode { self.opcode }

    /// Whether this frame completes its message.
    #[must_use]
    pub const fn is_fin(&self) -> bool { self.fin }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[fin={}, len={}]",
            self.opcode,
            self.fin,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0x0, Some(OpCode::Continuation))]
    #[case(0x1, Some(OpCode::Text))]
    #[case(0x2, Some(OpCode::Binary))]
    #[case(0x8, Some(OpCode::Close))]
    #[case(0x9, Some(OpCode::Ping))]
    #[case(0xA, Some(OpCode::Pong))]
    #[case(0x3, None)]
    #[case(0xF, None)]
    fn opcode_from_raw_value(#[case] raw: u8, #[case] expected: Option<OpCode>) {
        assert_eq!(OpCode::from_u8(raw), expected);
        if let Some(opcode) = expected {
            assert_eq!(opcode.as_u8(), raw);
        }
    }

    #[test]
    fn only_control_opcodes_report_control() {
        assert!(OpCode::Close.is_control());
        assert!(OpCode::Ping.is_control());
        assert!(!OpCode::Text.is_control());
        assert!(!OpCode::Continuation.is_control());
    }

    #[test]
    fn close_frame_encodes_status_then_reason() {
        let frame = Frame::close(1000, "bye");
        assert_eq!(frame.opcode(), OpCode::Close);
        assert_eq!(frame.payload().as_ref(), &[0x03, 0xE8, b'b', b'y', b'e']);
    }

    #[test]
    fn display_includes_opcode_and_length() {
        let frame = Frame::binary(vec![1, 2, 3]).with_fin(false);
        assert_eq!(frame.to_string(), "BINARY[fin=false, len=3]");
    }
}
