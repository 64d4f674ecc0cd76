#![cfg(any(test, feature = "test-helpers"))]
//! Doubles shared by unit tests and the `wsdriver_testing` crate.

use std::{
    io,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use bytes::BytesMut;

use crate::{
    close::CloseCode,
    connection::Connection,
    frame::Frame,
    pool::{BufferPool, DefaultBufferPool},
};

/// [`DefaultBufferPool`] wrapper counting acquisitions and releases.
#[derive(Debug, Default)]
pub struct CountingPool {
    inner: DefaultBufferPool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingPool {
    /// Buffers handed out so far.
    #[must_use]
    pub fn acquired(&self) -> usize { self.acquired.load(Ordering::SeqCst) }

    /// Buffers returned so far.
    #[must_use]
    pub fn released(&self) -> usize { self.released.load(Ordering::SeqCst) }

    /// Buffers currently on loan.
    #[must_use]
    pub fn outstanding(&self) -> usize { self.acquired().saturating_sub(self.released()) }
}

impl BufferPool for CountingPool {
    fn acquire(&self, size: usize) -> BytesMut {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.inner.acquire(size)
    }

    fn release(&self, buffer: BytesMut) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(buffer);
    }
}

/// Connection double recording every close and outbound frame.
#[derive(Debug, Default)]
pub struct RecordingConnection {
    closes: Mutex<Vec<(CloseCode, String)>>,
    sent: Mutex<Vec<Frame>>,
    fail_close: AtomicBool,
}

impl RecordingConnection {
    /// Shared connection that accepts every request.
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Shared connection whose `close` records the request and then fails.
    #[must_use]
    pub fn failing() -> Arc<Self> {
        let conn = Self::default();
        conn.fail_close.store(true, Ordering::SeqCst);
        Arc::new(conn)
    }

    /// Close requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn closes(&self) -> Vec<(CloseCode, String)> {
        self.closes.lock().expect("closes lock poisoned").clone()
    }

    /// Frames sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> { self.sent.lock().expect("sent lock poisoned").clone() }
}

impl Connection for RecordingConnection {
    fn close(&self, code: CloseCode, reason: &str) -> io::Result<()> {
        self.closes
            .lock()
            .expect("closes lock poisoned")
            .push((code, reason.to_owned()));
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        }
        Ok(())
    }

    fn send(&self, frame: Frame) -> io::Result<()> {
        self.sent.lock().expect("sent lock poisoned").push(frame);
        Ok(())
    }

    fn is_open(&self) -> bool { self.closes.lock().is_ok_and(|closes| closes.is_empty()) }
}
