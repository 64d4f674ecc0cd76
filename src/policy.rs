//! Per-connection policy: buffer sizing, message ceilings and role.
//!
//! A [`WebSocketPolicy`] is supplied by the caller when a session is created.
//! Application types may carry declarative [`PolicyOverrides`] in their event
//! table; these are applied once, at construction, and the policy is
//! read-only afterwards.

use std::time::Duration;

use serde::Deserialize;

use crate::{close::CloseCode, frame::MessageFamily};

/// Default reassembly buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
/// Default maximum size of a buffered text or binary message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;
/// Default idle timeout.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(300);

/// Which side of the connection this endpoint plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    /// Accepted connection.
    #[default]
    Server,
    /// Initiated connection.
    Client,
}

impl Behavior {
    /// Status used when an unhandled failure terminates the connection.
    #[must_use]
    pub const fn failure_code(self) -> CloseCode {
        match self {
            Self::Server => CloseCode::SERVER_ERROR,
            Self::Client => CloseCode::POLICY_VIOLATION,
        }
    }
}

/// Limits and role for one connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wsdriver::policy::{Behavior, WebSocketPolicy};
///
/// let policy = WebSocketPolicy::new(Behavior::Client)
///     .with_buffer_size(8 * 1024)
///     .with_max_idle_time(Duration::from_secs(30));
///
/// assert_eq!(policy.behavior(), Behavior::Client);
/// assert_eq!(policy.buffer_size(), 8 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebSocketPolicy {
    behavior: Behavior,
    buffer_size: usize,
    max_text_message_size: usize,
    max_binary_message_size: usize,
    #[serde(with = "duration_secs")]
    max_idle_time: Duration,
}

impl Default for WebSocketPolicy {
    fn default() -> Self { Self::new(Behavior::default()) }
}

impl WebSocketPolicy {
    /// Policy with library defaults for the given role.
    #[must_use]
    pub const fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_text_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_binary_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
        }
    }

    /// Server-role defaults.
    #[must_use]
    pub const fn server() -> Self { Self::new(Behavior::Server) }

    /// Client-role defaults.
    #[must_use]
    pub const fn client() -> Self { Self::new(Behavior::Client) }

    /// Set the reassembly buffer size.
    #[must_use]
    pub const fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Set the maximum buffered text message size.
    #[must_use]
    pub const fn with_max_text_message_size(mut self, bytes: usize) -> Self {
        self.max_text_message_size = bytes;
        self
    }

    /// Set the maximum buffered binary message size.
    #[must_use]
    pub const fn with_max_binary_message_size(mut self, bytes: usize) -> Self {
        self.max_binary_message_size = bytes;
        self
    }

    /// Set the idle timeout enforced by the transport.
    #[must_use]
    pub const fn with_max_idle_time(mut self, idle: Duration) -> Self {
        self.max_idle_time = idle;
        self
    }

    /// Apply declarative overrides. Unset fields keep their current value.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &PolicyOverrides) -> Self {
        if let Some(bytes) = overrides.buffer_size {
            self.buffer_size = bytes;
        }
        if let Some(bytes) = overrides.max_text_message_size {
            self.max_text_message_size = bytes;
        }
        if let Some(bytes) = overrides.max_binary_message_size {
            self.max_binary_message_size = bytes;
        }
        if let Some(idle) = overrides.max_idle_time {
            self.max_idle_time = idle;
        }
        self
    }

    /// Connection role.
    #[must_use]
    pub const fn behavior(&self) -> Behavior { self.behavior }

    /// Reassembly buffer size in bytes.
    #[must_use]
    pub const fn buffer_size(&self) -> usize { self.buffer_size }

    /// Maximum buffered text message size in bytes.
    #[must_use]
    pub const fn max_text_message_size(&self) -> usize { self.max_text_message_size }

    /// Maximum buffered binary message size in bytes.
    #[must_use]
    pub const fn max_binary_message_size(&self) -> usize { self.max_binary_message_size }

    /// Idle timeout. Enforced by the transport, carried here for it to read.
    #[must_use]
    pub const fn max_idle_time(&self) -> Duration { self.max_idle_time }

    /// Capacity of the reassembly buffer for a buffered message of `family`.
    ///
    /// The buffer never exceeds `buffer_size`, and the per-family message
    /// ceiling narrows it further.
    #[must_use]
    pub fn buffered_limit(&self, family: MessageFamily) -> usize {
        let ceiling = match family {
            MessageFamily::Text => self.max_text_message_size,
            MessageFamily::Binary => self.max_binary_message_size,
        };
        self.buffer_size.min(ceiling)
    }
}

/// Declarative policy metadata attached to an application type.
///
/// ```
/// use wsdriver::policy::{PolicyOverrides, WebSocketPolicy};
///
/// let overrides = PolicyOverrides {
///     buffer_size: Some(1024),
///     ..PolicyOverrides::default()
/// };
/// let policy = WebSocketPolicy::server().with_overrides(&overrides);
/// assert_eq!(policy.buffer_size(), 1024);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    /// Reassembly buffer size.
    pub buffer_size: Option<usize>,
    /// Maximum buffered text message size.
    pub max_text_message_size: Option<usize>,
    /// Maximum buffered binary message size.
    pub max_binary_message_size: Option<usize>,
    /// Idle timeout.
    #[serde(with = "opt_duration_secs")]
    pub max_idle_time: Option<Duration>,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}
