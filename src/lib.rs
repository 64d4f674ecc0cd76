#![doc(html_root_url = "https://docs.rs/wsdriver/latest")]
//! Public API for the `wsdriver` library.
//!
//! This crate is the per-connection core of a WebSocket endpoint: it takes
//! parsed frames, reassembles fragmented messages and dispatches
//! connect, text, binary, close and error events to an application through
//! a precomputed event table. Failures close the connection with the
//! appropriate status.
//!
//! Frame decoding, the HTTP upgrade and socket I/O live outside this crate.

pub mod assembly;
pub mod close;
pub mod connection;
pub mod driver;
pub mod error;
pub mod events;
pub mod frame;
pub mod metrics;
pub mod panic;
pub mod policy;
pub mod pool;
pub mod stream;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use close::{CloseCode, CloseException, CloseInfo};
pub use connection::Connection;
pub use driver::EventDriver;
pub use error::{DispatchError, HandlerFailure, HandlerResult};
pub use events::{
    Discipline,
    EventKind,
    EventTable,
    EventTableCache,
    SessionContext,
    WebSocketEndpoint,
    WebSocketListener,
};
pub use frame::{Frame, MessageFamily, OpCode};
pub use self::metrics::{
    FRAMES_PROCESSED,
    MESSAGES_DELIVERED,
    POOLED_BUFFERS_OUTSTANDING,
    TERMINATIONS,
};
pub use policy::{Behavior, PolicyOverrides, WebSocketPolicy};
pub use pool::{BufferPool, DefaultBufferPool};
pub use stream::{MessageStream, TextStream};
