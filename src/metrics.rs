//! Metric helpers for `wsdriver`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::{close::CloseCode, events::Discipline, frame::MessageFamily};

/// Name of the counter tracking frames handed to the driver.
pub const FRAMES_PROCESSED: &str = "wsdriver_frames_processed_total";
/// Name of the counter tracking messages delivered to applications.
pub const MESSAGES_DELIVERED: &str = "wsdriver_messages_delivered_total";
/// Name of the counter tracking connections terminated by the driver.
pub const TERMINATIONS: &str = "wsdriver_terminations_total";
/// Name of the gauge tracking pool buffers currently on loan.
pub const POOLED_BUFFERS_OUTSTANDING: &str = "wsdriver_pooled_buffers_outstanding";

/// Record a frame handed to the driver.
#[cfg(feature = "metrics")]
pub fn inc_frames() { counter!(FRAMES_PROCESSED).increment(1); }

/// Record a message delivered with the given family and discipline.
#[cfg(feature = "metrics")]
pub fn inc_messages(family: MessageFamily, discipline: Discipline) {
    counter!(
        MESSAGES_DELIVERED,
        "family" => family.as_str(),
        "discipline" => discipline.as_str()
    )
    .increment(1);
}

/// Record a termination with the given close status.
#[cfg(feature = "metrics")]
pub fn inc_terminations(code: CloseCode) {
    counter!(TERMINATIONS, "code" => code.to_string()).increment(1);
}

/// Increment the outstanding pooled buffers gauge.
#[cfg(feature = "metrics")]
pub fn inc_pooled_buffers() { gauge!(POOLED_BUFFERS_OUTSTANDING).increment(1.0); }

/// Decrement the outstanding pooled buffers gauge.
#[cfg(feature = "metrics")]
pub fn dec_pooled_buffers() { gauge!(POOLED_BUFFERS_OUTSTANDING).decrement(1.0); }

/// Record a frame handed to the driver.
#[cfg(not(feature = "metrics"))]
pub fn inc_frames() {}

/// Record a message delivered with the given family and discipline.
#[cfg(not(feature = "metrics"))]
pub fn inc_messages(_family: MessageFamily, _discipline: Discipline) {}

/// Record a termination with the given close status.
#[cfg(not(feature = "metrics"))]
pub fn inc_terminations(_code: CloseCode) {}

/// Increment the outstanding pooled buffers gauge.
#[cfg(not(feature = "metrics"))]
pub fn inc_pooled_buffers() {}

/// Decrement the outstanding pooled buffers gauge.
#[cfg(not(feature = "metrics"))]
pub fn dec_pooled_buffers() {}
