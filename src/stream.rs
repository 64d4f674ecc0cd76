//! Incremental message streams for the streaming delivery discipline.
//!
//! On the first fragment of a streaming message the driver creates a
//! [`StreamAppender`] / [`MessageStream`] pair with [`message_stream`] and
//! gives the reading half to the application. Later fragments are appended
//! as they arrive; the FIN fragment finishes the appender, which the reader
//! observes as end-of-stream. A message cut short before its FIN fragment
//! is aborted instead, and the reader sees [`StreamError::Aborted`] rather
//! than a clean end.
//!
//! Stream chunks are fresh allocations (or shared views of the frame
//! payload), never pool buffers: the application decides when it has
//! finished reading, and the driver cannot observe that.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

/// Errors surfaced while decoding a text stream.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The stream contained bytes that are not UTF-8.
    #[error("text stream is not valid UTF-8")]
    InvalidUtf8,
    /// The stream ended in the middle of a multi-byte character.
    #[error("text stream ended inside a UTF-8 sequence")]
    TruncatedUtf8,
    /// The message was abandoned before its final fragment arrived.
    #[error("message aborted before its final fragment")]
    Aborted,
}

/// Result of a non-blocking read from a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryChunk<T> {
    /// The next chunk.
    Ready(T),
    /// Nothing buffered yet; more fragments are expected.
    Empty,
    /// End-of-stream has been signalled and every chunk consumed.
    Finished,
    /// The message was abandoned; the chunks read so far are incomplete.
    Aborted,
}

/// Create a connected appender and reader.
#[must_use]
pub fn message_stream() -> (StreamAppender, MessageStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        StreamAppender { tx, appended: 0 },
        MessageStream { rx, aborted: false },
    )
}

/// Writing half of a streaming message, held by the driver.
#[derive(Debug)]
pub struct StreamAppender {
    tx: UnboundedSender<Result<Bytes, StreamError>>,
    appended: usize,
}

impl StreamAppender {
    /// Append one fragment payload.
    ///
    /// Empty payloads are skipped. If the application has already dropped
    /// its reader the payload is discarded.
    pub fn append(&mut self, payload: Bytes) {
        if payload.is_empty() {
            return;
        }
        self.appended = self.appended.saturating_add(payload.len());
        if self.tx.send(Ok(payload)).is_err() {
            tracing::trace!("stream reader dropped; discarding fragment");
        }
    }

    /// Total bytes appended so far.
    #[must_use]
    pub const fn appended(&self) -> usize { self.appended }

    /// Signal end-of-stream. Consumes the appender so it can only happen once.
    pub fn finish(self) {
        tracing::trace!(bytes = self.appended, "stream complete");
    }

    /// Cut the message short. The reader drains what was appended and then
    /// sees [`StreamError::Aborted`] instead of end-of-stream.
    pub fn abort(self) {
        tracing::trace!(bytes = self.appended, "stream aborted");
        if self.tx.send(Err(StreamError::Aborted)).is_err() {
            tracing::trace!("stream reader dropped before abort");
        }
    }
}

/// Reading half of a streaming binary message.
///
/// Implements [`Stream`] for async consumers; [`try_next_chunk`]
/// serves callers that poll synchronously.
///
/// [`try_next_chunk`]: Self::try_next_chunk
#[derive(Debug)]
pub struct MessageStream {
    rx: UnboundedReceiver<Result<Bytes, StreamError>>,
    aborted: bool,
}

impl MessageStream {
    /// Take the next buffered chunk without waiting.
    ///
    /// Once the message has been aborted every later call returns
    /// [`TryChunk::Aborted`].
    pub fn try_next_chunk(&mut self) -> TryChunk<Bytes> {
        if self.aborted {
            return TryChunk::Aborted;
        }
        match self.rx.try_recv() {
            Ok(Ok(chunk)) => TryChunk::Ready(chunk),
            Ok(Err(_)) => {
                self.aborted = true;
                TryChunk::Aborted
            }
            Err(TryRecvError::Empty) => TryChunk::Empty,
            Err(TryRecvError::Disconnected) => TryChunk::Finished,
        }
    }

    /// Wait for the next chunk; `None` once the stream has finished.
    ///
    /// An aborted message yields [`StreamError::Aborted`] once, then `None`.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, StreamError>> {
        if self.aborted {
            return None;
        }
        let item = self.rx.recv().await;
        self.note(item.as_ref());
        item
    }

    /// Wait for the whole message.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Aborted`] when the message was cut short.
    pub async fn read_to_end(mut self) -> Result<Bytes, StreamError> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.freeze())
    }

    /// Interpret the stream as UTF-8 text.
    #[must_use]
    pub fn into_text(self) -> TextStream {
        TextStream {
            inner: self,
            pending: Vec::new(),
        }
    }

    fn note(&mut self, item: Option<&Result<Bytes, StreamError>>) {
        if matches!(item, Some(Err(_))) {
            self.aborted = true;
        }
    }
}

impl Stream for MessageStream {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.aborted {
            return Poll::Ready(None);
        }
        let item = std::task::ready!(self.rx.poll_recv(cx));
        self.note(item.as_ref());
        Poll::Ready(item)
    }
}

/// Reading half of a streaming text message.
///
/// Fragment boundaries may split a multi-byte character; the incomplete
/// tail is carried into the next chunk so every yielded `String` is whole.
#[derive(Debug)]
pub struct TextStream {
    inner: MessageStream,
    pending: Vec<u8>,
}

impl TextStream {
    /// Take the next decodable text without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the bytes are not UTF-8 or the stream
    /// ends inside a character.
    pub fn try_next_text(&mut self) -> Result<TryChunk<String>, StreamError> {
        loop {
            match self.inner.try_next_chunk() {
                TryChunk::Ready(chunk) => {
                    let text = self.decode(&chunk)?;
                    if !text.is_empty() {
                        return Ok(TryChunk::Ready(text));
                    }
                }
                TryChunk::Empty => return Ok(TryChunk::Empty),
                TryChunk::Aborted => {
                    self.pending.clear();
                    return Err(StreamError::Aborted);
                }
                TryChunk::Finished => {
                    self.finish()?;
                    return Ok(TryChunk::Finished);
                }
            }
        }
    }

    /// Wait for the next decodable text; `None` once the stream has finished.
    pub async fn next_text(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            let chunk = match self.inner.next_chunk().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
                None => return self.finish().err().map(Err),
            };
            match self.decode(&chunk) {
                Ok(text) if text.is_empty() => {}
                other => return Some(other),
            }
        }
    }

    /// Wait for the whole message.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the message is not UTF-8 or was aborted.
    pub async fn read_to_string(mut self) -> Result<String, StreamError> {
        let mut out = String::new();
        while let Some(text) = self.next_text().await {
            out.push_str(&text?);
        }
        Ok(out)
    }

    fn decode(&mut self, chunk: &[u8]) -> Result<String, StreamError> {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                self.pending.clear();
                return Err(StreamError::InvalidUtf8);
            }
        };
        let tail = self.pending.split_off(valid);
        let head = std::mem::replace(&mut self.pending, tail);
        String::from_utf8(head).map_err(|_| StreamError::InvalidUtf8)
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            self.pending.clear();
            Err(StreamError::TruncatedUtf8)
        }
    }
}

impl Stream for TextStream {
    type Item = Result<String, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match std::task::ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(chunk)) => match self.decode(&chunk) {
                    Ok(text) if text.is_empty() => {}
                    other => return Poll::Ready(Some(other)),
                },
                Some(Err(e)) => {
                    self.pending.clear();
                    return Poll::Ready(Some(Err(e)));
                }
                None => return Poll::Ready(self.finish().err().map(Err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn chunks_arrive_in_order_then_finish() {
        let (mut appender, mut stream) = message_stream();
        appender.append(Bytes::from_static(b"one"));
        assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"one")));
        assert_eq!(stream.try_next_chunk(), TryChunk::Empty);

        appender.append(Bytes::from_static(b"two"));
        appender.finish();
        assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"two")));
        assert_eq!(stream.try_next_chunk(), TryChunk::Finished);
    }

    #[test]
    fn appending_after_reader_dropped_is_harmless() {
        let (mut appender, stream) = message_stream();
        drop(stream);
        appender.append(Bytes::from_static(b"ignored"));
        assert_eq!(appender.appended(), 7);
    }

    #[test]
    fn text_stream_reassembles_split_characters() {
        let (mut appender, stream) = message_stream();
        let mut text = stream.into_text();
        let bytes = "héllo".as_bytes();

        // Split inside the two-byte 'é'.
        appender.append(Bytes::copy_from_slice(&bytes[..2]));
        assert_eq!(text.try_next_text(), Ok(TryChunk::Ready("h".to_owned())));
        appender.append(Bytes::copy_from_slice(&bytes[2..]));
        appender.finish();
        assert_eq!(text.try_next_text(), Ok(TryChunk::Ready("éllo".to_owned())));
        assert_eq!(text.try_next_text(), Ok(TryChunk::Finished));
    }

    #[test]
    fn text_stream_rejects_invalid_bytes() {
        let (mut appender, stream) = message_stream();
        let mut text = stream.into_text();
        appender.append(Bytes::from_static(&[0xFF, 0x41]));
        assert_eq!(text.try_next_text(), Err(StreamError::InvalidUtf8));
    }

    #[test]
    fn text_stream_reports_truncated_tail() {
        let (mut appender, stream) = message_stream();
        let mut text = stream.into_text();
        appender.append(Bytes::from_static(&[0xC3]));
        appender.finish();
        assert_eq!(text.try_next_text(), Err(StreamError::TruncatedUtf8));
    }

    #[tokio::test]
    async fn async_readers_collect_whole_message() {
        let (mut appender, stream) = message_stream();
        appender.append(Bytes::from_static(b"Hel"));
        appender.append(Bytes::from_static(b"lo"));
        appender.finish();
        assert_eq!(stream.into_text().read_to_string().await, Ok("Hello".to_owned()));

        let (mut appender, stream) = message_stream();
        appender.append(Bytes::from_static(b"ab"));
        appender.finish();
        let chunks: Vec<Result<Bytes, StreamError>> = stream.collect().await;
        assert_eq!(chunks, vec![Ok(Bytes::from_static(b"ab"))]);
    }

    #[test]
    fn aborted_stream_is_distinguishable_from_finished() {
        let (mut appender, mut stream) = message_stream();
        appender.append(Bytes::from_static(b"ab"));
        appender.abort();
        assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"ab")));
        assert_eq!(stream.try_next_chunk(), TryChunk::Aborted);
        assert_eq!(stream.try_next_chunk(), TryChunk::Aborted);
    }

    #[tokio::test]
    async fn async_readers_report_abort() {
        let (mut appender, stream) = message_stream();
        appender.append(Bytes::from_static(b"partial"));
        appender.abort();
        assert_eq!(stream.read_to_end().await, Err(StreamError::Aborted));

        let (mut appender, stream) = message_stream();
        appender.append(Bytes::from_static(b"Hel"));
        appender.abort();
        assert_eq!(
            stream.into_text().read_to_string().await,
            Err(StreamError::Aborted)
        );

        let (mut appender, stream) = message_stream();
        appender.append(Bytes::from_static(b"ab"));
        appender.abort();
        let items: Vec<Result<Bytes, StreamError>> = stream.collect().await;
        assert_eq!(
            items,
            vec![Ok(Bytes::from_static(b"ab")), Err(StreamError::Aborted)]
        );
    }

    #[test]
    fn text_stream_reports_abort() {
        let (mut appender, stream) = message_stream();
        let mut text = stream.into_text();
        appender.append(Bytes::from_static(b"hi"));
        appender.abort();
        assert_eq!(text.try_next_text(), Ok(TryChunk::Ready("hi".to_owned())));
        assert_eq!(text.try_next_text(), Err(StreamError::Aborted));
    }
}
