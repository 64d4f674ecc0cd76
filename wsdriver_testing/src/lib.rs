//! Test doubles and helpers for exercising a
//! [`EventDriver`](wsdriver::driver::EventDriver) without a network.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use wsdriver::{EventDriver, EventTable, OpCode, WebSocketPolicy};
//! use wsdriver_testing::{CountingPool, RecordingConnection, fragments};
//!
//! let pool = Arc::new(CountingPool::default());
//! let conn = RecordingConnection::new();
//! let mut driver = EventDriver::new(
//!     (),
//!     Arc::new(EventTable::empty()),
//!     WebSocketPolicy::server(),
//!     pool.clone(),
//! );
//! driver.set_connection(conn.clone());
//! for frame in fragments(OpCode::Text, &["He", "llo"]) {
//!     driver.on_frame(frame);
//! }
//! assert!(conn.closes().is_empty());
//! assert_eq!(pool.acquired(), 0);
//! ```

pub mod frames;
pub mod logging;
pub mod metrics;

pub use frames::{fragments, fragments_by_size};
pub use logging::{LoggerHandle, logger};
pub use metrics::{counter_value, debugging_recorder_setup, gauge_value};
pub use wsdriver::test_helpers::{CountingPool, RecordingConnection};
