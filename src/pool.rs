//! Buffer pooling for buffered message reassembly.
//!
//! [`BufferPool`] is the acquire/release capability the driver consumes. The
//! crate ships [`DefaultBufferPool`], a small bucketed free-list, but any
//! implementation may be supplied. [`PooledBuffer`] owns one acquired buffer
//! and hands it back on drop, so every exit path releases it exactly once.

use std::{fmt, sync::Arc};

use bytes::BytesMut;
use dashmap::DashMap;

/// Source of reusable byte buffers shared by every session.
pub trait BufferPool: Send + Sync + 'static {
    /// Obtain an empty buffer with capacity for at least `size` bytes.
    fn acquire(&self, size: usize) -> BytesMut;

    /// Return a buffer previously obtained from [`acquire`](Self::acquire).
    fn release(&self, buffer: BytesMut);
}

/// Default number of idle buffers retained per capacity bucket.
pub const DEFAULT_RETAINED_PER_BUCKET: usize = 16;

/// Free-list pool with power-of-two capacity buckets.
///
/// ```
/// use wsdriver::pool::{BufferPool, DefaultBufferPool};
///
/// let pool = DefaultBufferPool::default();
/// let buffer = pool.acquire(1024);
/// assert!(buffer.capacity() >= 1024);
/// pool.release(buffer);
/// assert_eq!(pool.idle_buffers(), 1);
/// ```
pub struct DefaultBufferPool {
    buckets: DashMap<usize, Vec<BytesMut>>,
    retained_per_bucket: usize,
}

impl DefaultBufferPool {
    /// Create a pool retaining up to `retained_per_bucket` idle buffers per size.
    #[must_use]
    pub fn new(retained_per_bucket: usize) -> Self {
        Self {
            buckets: DashMap::new(),
            retained_per_bucket,
        }
    }

    /// Number of idle buffers currently held.
    #[must_use]
    pub fn idle_buffers(&self) -> usize { self.buckets.iter().map(|bucket| bucket.len()).sum() }
}

impl Default for DefaultBufferPool {
    fn default() -> Self { Self::new(DEFAULT_RETAINED_PER_BUCKET) }
}

impl fmt::Debug for DefaultBufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBufferPool")
            .field("idle_buffers", &self.idle_buffers())
            .field("retained_per_bucket", &self.retained_per_bucket)
            .finish()
    }
}

impl BufferPool for DefaultBufferPool {
    fn acquire(&self, size: usize) -> BytesMut {
        // No bucket this large: hand out an unpooled buffer that grows on demand.
        let Some(bucket) = size.max(1).checked_next_power_of_two() else {
            return BytesMut::new();
        };
        self.buckets
            .get_mut(&bucket)
            .and_then(|mut idle| idle.pop())
            .unwrap_or_else(|| BytesMut::with_capacity(bucket))
    }

    fn release(&self, mut buffer: BytesMut) {
        let capacity = buffer.capacity();
        if capacity == 0 {
            return;
        }
        // Largest bucket this buffer can fully serve.
        let bucket = 1_usize << (usize::BITS - 1 - capacity.leading_zeros());
        buffer.clear();
        let mut idle = self.buckets.entry(bucket).or_default();
        if idle.len() < self.retained_per_bucket {
            idle.push(buffer);
        }
    }
}

/// Returned by [`PooledBuffer::append`] when the payload does not fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityExceeded {
    /// Bytes that would have been held after the append.
    pub attempted: usize,
    /// Capacity the buffer was acquired with.
    pub limit: usize,
}

/// A pool buffer on loan to one in-flight message.
///
/// The buffer is bounded by the `limit` it was acquired with, regardless of
/// the spare capacity the pool handed out. Dropping the guard releases the
/// buffer to its pool.
pub struct PooledBuffer {
    buffer: Option<BytesMut>,
    limit: usize,
    pool: Arc<dyn BufferPool>,
}

impl PooledBuffer {
    /// Acquire a buffer of `limit` bytes from `pool`.
    #[must_use]
    pub fn acquire(pool: &Arc<dyn BufferPool>, limit: usize) -> Self {
        let mut buffer = pool.acquire(limit);
        buffer.clear();
        crate::metrics::inc_pooled_buffers();
        Self {
            buffer: Some(buffer),
            limit,
            pool: Arc::clone(pool),
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize { self.as_slice().len() }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Bytes that may still be appended.
    #[must_use]
    pub fn remaining(&self) -> usize { self.limit.saturating_sub(self.len()) }

    /// Capacity the buffer was acquired with.
    #[must_use]
    pub const fn limit(&self) -> usize { self.limit }

    /// Append `payload`, refusing it if it does not fit in the remaining space.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] and leaves the contents untouched when
    /// `payload` is larger than [`remaining`](Self::remaining).
    pub fn append(&mut self, payload: &[u8]) -> Result<(), CapacityExceeded> {
        if self.remaining() < payload.len() {
            return Err(CapacityExceeded {
                attempted: self.len().saturating_add(payload.len()),
                limit: self.limit,
            });
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.extend_from_slice(payload);
        }
        Ok(())
    }

    /// Readable view of the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { self.buffer.as_deref().unwrap_or_default() }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
            crate::metrics::dec_pooled_buffers();
        }
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
