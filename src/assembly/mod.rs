//! Reassembly of fragmented text and binary messages.
//!
//! A session assembles at most one message at a time. [`MessageAssembly`]
//! is that single slot: idle, holding a pooled buffer for a buffered
//! message, or holding the appender of a streaming message.
//!
//! Buffered messages are bounded by the limit passed on their first
//! fragment; streaming messages are not bounded here.

use std::{fmt, mem, sync::Arc};

use bytes::Bytes;

use crate::{
    error::DispatchError,
    frame::{MessageFamily, OpCode},
    pool::{BufferPool, CapacityExceeded, PooledBuffer},
    stream::{MessageStream, StreamAppender, message_stream},
};

/// Contents of the assembly slot.
enum Slot {
    Idle,
    Buffered {
        family: MessageFamily,
        buffer: PooledBuffer,
    },
    Streaming {
        family: MessageFamily,
        appender: StreamAppender,
    },
}

impl Slot {
    fn family(&self) -> Option<MessageFamily> {
        match self {
            Self::Idle => None,
            Self::Buffered { family, .. } | Self::Streaming { family, .. } => Some(*family),
        }
    }
}

/// Single-slot message assembler for one session.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use wsdriver::{
///     assembly::MessageAssembly,
///     frame::MessageFamily,
///     pool::{BufferPool, DefaultBufferPool},
/// };
///
/// let pool: Arc<dyn BufferPool> = Arc::new(DefaultBufferPool::default());
/// let mut assembly = MessageAssembly::new(pool);
///
/// let partial = assembly
///     .accept_buffered(MessageFamily::Text, b"He", false, 1024)
///     .expect("first fragment accepted");
/// assert!(partial.is_none());
///
/// let complete = assembly
///     .accept_buffered(MessageFamily::Text, b"llo", true, 1024)
///     .expect("final fragment accepted")
///     .expect("message complete");
/// assert_eq!(complete.as_slice(), b"Hello");
/// assert!(assembly.is_idle());
/// ```
pub struct MessageAssembly {
    slot: Slot,
    pool: Arc<dyn BufferPool>,
}

impl MessageAssembly {
    /// Create an idle assembler drawing buffers from `pool`.
    #[must_use]
    pub fn new(pool: Arc<dyn BufferPool>) -> Self {
        Self {
            slot: Slot::Idle,
            pool,
        }
    }

    /// Family of the message currently being assembled.
    #[must_use]
    pub fn in_flight(&self) -> Option<MessageFamily> { self.slot.family() }

    /// Whether no message is being assembled.
    #[must_use]
    pub fn is_idle(&self) -> bool { matches!(self.slot, Slot::Idle) }

    /// Pool used for buffered messages.
    #[must_use]
    pub fn pool(&self) -> &Arc<dyn BufferPool> { &self.pool }

    /// Accept one fragment of a buffered message.
    ///
    /// The first fragment acquires a buffer of `limit` bytes; `limit` is
    /// ignored for later fragments. Returns the filled buffer once `fin` is
    /// set, leaving the slot idle. Dropping the returned buffer releases it
    /// to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MessageTooLarge`] when the fragment does not
    /// fit; the slot is cleared and the buffer released before returning.
    /// Returns [`DispatchError::UnexpectedDataFrame`] when a message of
    /// another family or discipline is in flight.
    pub fn accept_buffered(
        &mut self,
        family: MessageFamily,
        payload: &[u8],
        fin: bool,
        limit: usize,
    ) -> Result<Option<PooledBuffer>, DispatchError> {
        let mut buffer = match mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => PooledBuffer::acquire(&self.pool, limit),
            Slot::Buffered {
                family: current,
                buffer,
            } if current == family => buffer,
            other => return Err(self.reject(other, family)),
        };

        if let Err(CapacityExceeded { attempted, limit }) = buffer.append(payload) {
            return Err(DispatchError::MessageTooLarge {
                family,
                attempted,
                limit,
            });
        }

        if fin {
            return Ok(Some(buffer));
        }
        self.slot = Slot::Buffered { family, buffer };
        Ok(None)
    }

    /// Accept one fragment of a streaming message.
    ///
    /// The first fragment opens a stream and returns its reading half, after
    /// the fragment's payload has been appended. Later fragments are
    /// appended to the open stream. When `fin` is set the stream is finished
    /// and the slot left idle.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnexpectedDataFrame`] when a message of
    /// another family or discipline is in flight.
    pub fn accept_streaming(
        &mut self,
        family: MessageFamily,
        payload: Bytes,
        fin: bool,
    ) -> Result<Option<MessageStream>, DispatchError> {
        let (mut appender, opened) = match mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => {
                let (appender, stream) = message_stream();
                (appender, Some(stream))
            }
            Slot::Streaming {
                family: current,
                appender,
            } if current == family => (appender, None),
            other => return Err(self.reject(other, family)),
        };

        appender.append(payload);
        if fin {
            appender.finish();
        } else {
            self.slot = Slot::Streaming { family, appender };
        }
        Ok(opened)
    }

    /// Drop any in-flight message: a pooled buffer is released, an open
    /// stream is aborted so its reader never mistakes it for a whole message.
    pub fn abandon(&mut self) {
        match mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => {}
            Slot::Buffered { family, buffer } => {
                tracing::debug!(%family, bytes = buffer.len(), "abandoning buffered message");
            }
            Slot::Streaming { family, appender } => {
                tracing::debug!(%family, bytes = appender.appended(), "abandoning streaming message");
                appender.abort();
            }
        }
    }

    fn reject(&mut self, current: Slot, received: MessageFamily) -> DispatchError {
        let in_flight = current.family().unwrap_or(received);
        self.slot = current;
        DispatchError::UnexpectedDataFrame {
            in_flight,
            received: opcode_for(received),
        }
    }
}

fn opcode_for(family: MessageFamily) -> OpCode {
    match family {
        MessageFamily::Text => OpCode::Text,
        MessageFamily::Binary => OpCode::Binary,
    }
}

impl fmt::Debug for MessageAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.slot {
            Slot::Idle => "idle",
            Slot::Buffered { .. } => "buffered",
            Slot::Streaming { .. } => "streaming",
        };
        f.debug_struct("MessageAssembly")
            .field("state", &state)
            .field("family", &self.in_flight())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
