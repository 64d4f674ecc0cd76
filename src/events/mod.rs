//! Event tables: which callbacks an application type wants, and how.
//!
//! An [`EventTable`] is the precomputed set of optional callbacks for one
//! application type `H`, together with the delivery discipline chosen for
//! text and binary messages. Tables are built once per type (see
//! [`EventTableCache`]) and shared by every session of that type behind an
//! `Arc`; they never change after construction.
//!
//! Callbacks receive the application object mutably, a [`SessionContext`]
//! exposing the connection and policy, and the event payload.

mod cache;
mod listener;

use std::{fmt, io, sync::Arc};

pub use cache::EventTableCache;
pub use listener::WebSocketListener;

use crate::{
    close::CloseCode,
    connection::Connection,
    error::{DispatchError, HandlerResult},
    frame::{Frame, MessageFamily},
    policy::{PolicyOverrides, WebSocketPolicy},
    stream::{MessageStream, TextStream},
};

/// Application types that describe their own event table.
///
/// ```
/// use wsdriver::{
///     error::HandlerResult,
///     events::{EventTable, SessionContext, WebSocketEndpoint},
/// };
///
/// #[derive(Default)]
/// struct Echo {
///     seen: usize,
/// }
///
/// impl WebSocketEndpoint for Echo {
///     fn event_table() -> EventTable<Self> {
///         EventTable::builder()
///             .on_text(|echo: &mut Echo, _ctx: &SessionContext, _text: &str| -> HandlerResult {
///                 echo.seen += 1;
///                 Ok(())
///             })
///             .build()
///     }
/// }
/// ```
pub trait WebSocketEndpoint: Sized + Send + 'static {
    /// Build the event table for this type. Called once per type by
    /// [`EventTableCache`].
    fn event_table() -> EventTable<Self>;
}

/// Event kinds an application may register for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Connection established.
    Connect,
    /// Text message.
    Text,
    /// Binary message.
    Binary,
    /// Peer sent CLOSE.
    Close,
    /// A failure terminated, or was reported on, the connection.
    Error,
    /// Read-only notification of every inbound frame.
    Frame,
}

/// How a text or binary message reaches the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// One delivery with the complete message after its FIN fragment.
    Buffered,
    /// A stream handle delivered on the first fragment, fed as fragments arrive.
    Streaming,
}

impl Discipline {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffered => "buffered",
            Self::Streaming => "streaming",
        }
    }
}

/// Per-session state visible to callbacks.
#[derive(Debug)]
pub struct SessionContext {
    connection: Option<Arc<dyn Connection>>,
    policy: WebSocketPolicy,
}

impl SessionContext {
    pub(crate) fn new(policy: WebSocketPolicy) -> Self {
        Self {
            connection: None,
            policy,
        }
    }

    pub(crate) fn attach(&mut self, connection: Arc<dyn Connection>) {
        self.connection = Some(connection);
    }

    /// Transport handle, once attached.
    #[must_use]
    pub fn connection(&self) -> Option<&Arc<dyn Connection>> { self.connection.as_ref() }

    /// Effective policy of the session.
    #[must_use]
    pub const fn policy(&self) -> &WebSocketPolicy { &self.policy }

    /// Send a frame over the attached connection.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when no connection is attached, or the
    /// transport's own error.
    pub fn send(&self, frame: Frame) -> io::Result<()> { self.require_connection()?.send(frame) }

    /// Close the attached connection.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when no connection is attached, or the
    /// transport's own error.
    pub fn close(&self, code: CloseCode, reason: &str) -> io::Result<()> {
        self.require_connection()?.close(code, reason)
    }

    fn require_connection(&self) -> io::Result<&Arc<dyn Connection>> {
        self.connection
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no connection attached"))
    }
}

/// Callback for the connect event.
pub type ConnectCallback<H> = Box<dyn Fn(&mut H, &SessionContext) -> HandlerResult + Send + Sync>;
/// Callback receiving a complete text message.
pub type TextCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, &str) -> HandlerResult + Send + Sync>;
/// Callback receiving a streaming text message.
pub type TextStreamCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, TextStream) -> HandlerResult + Send + Sync>;
/// Callback receiving a complete binary message.
pub type BinaryCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, &[u8]) -> HandlerResult + Send + Sync>;
/// Callback receiving a streaming binary message.
pub type BinaryStreamCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, MessageStream) -> HandlerResult + Send + Sync>;
/// Callback for a CLOSE frame from the peer.
pub type CloseCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, CloseCode, Option<&str>) -> HandlerResult + Send + Sync>;
/// Callback for failures.
pub type ErrorCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, &DispatchError) -> HandlerResult + Send + Sync>;
/// Callback observing every inbound frame.
pub type FrameCallback<H> =
    Box<dyn Fn(&mut H, &SessionContext, &Frame) -> HandlerResult + Send + Sync>;

/// Registered text handler and its discipline.
pub enum TextHandler<H> {
    /// Complete messages as `&str`.
    Buffered(TextCallback<H>),
    /// Incremental [`TextStream`]s.
    Streaming(TextStreamCallback<H>),
}

/// Registered binary handler and its discipline.
pub enum BinaryHandler<H> {
    /// Complete messages as `&[u8]`.
    Buffered(BinaryCallback<H>),
    /// Incremental [`MessageStream`]s.
    Streaming(BinaryStreamCallback<H>),
}

/// Immutable callback table for application type `H`.
pub struct EventTable<H> {
    connect: Option<ConnectCallback<H>>,
    text: Option<TextHandler<H>>,
    binary: Option<BinaryHandler<H>>,
    close: Option<CloseCallback<H>>,
    error: Option<ErrorCallback<H>>,
    frame: Option<FrameCallback<H>>,
    overrides: Option<PolicyOverrides>,
}

impl<H> EventTable<H> {
    /// Start building a table.
    #[must_use]
    pub fn builder() -> EventTableBuilder<H> { EventTableBuilder::default() }

    /// Table with no callbacks; every frame is discarded.
    #[must_use]
    pub fn empty() -> Self { Self::builder().build() }

    /// Whether a callback is registered for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Connect => self.connect.is_some(),
            EventKind::Text => self.text.is_some(),
            EventKind::Binary => self.binary.is_some(),
            EventKind::Close => self.close.is_some(),
            EventKind::Error => self.error.is_some(),
            EventKind::Frame => self.frame.is_some(),
        }
    }

    /// Delivery discipline for `family`, or `None` when unregistered.
    #[must_use]
    pub fn discipline(&self, family: MessageFamily) -> Option<Discipline> {
        match family {
            MessageFamily::Text => self.text.as_ref().map(|handler| match handler {
                TextHandler::Buffered(_) => Discipline::Buffered,
                TextHandler::Streaming(_) => Discipline::Streaming,
            }),
            MessageFamily::Binary => self.binary.as_ref().map(|handler| match handler {
                BinaryHandler::Buffered(_) => Discipline::Buffered,
                BinaryHandler::Streaming(_) => Discipline::Streaming,
            }),
        }
    }

    /// Declarative policy overrides carried by the table.
    #[must_use]
    pub const fn policy_overrides(&self) -> Option<&PolicyOverrides> { self.overrides.as_ref() }

    pub(crate) fn call_connect(&self, handler: &mut H, ctx: &SessionContext) -> HandlerResult {
        self.connect
            .as_ref()
            .map_or(Ok(()), |callback| callback(handler, ctx))
    }

    pub(crate) fn call_frame(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        frame: &Frame,
    ) -> HandlerResult {
        self.frame
            .as_ref()
            .map_or(Ok(()), |callback| callback(handler, ctx, frame))
    }

    pub(crate) fn call_close(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        code: CloseCode,
        reason: Option<&str>,
    ) -> HandlerResult {
        self.close
            .as_ref()
            .map_or(Ok(()), |callback| callback(handler, ctx, code, reason))
    }

    pub(crate) fn call_error(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        error: &DispatchError,
    ) -> HandlerResult {
        self.error
            .as_ref()
            .map_or(Ok(()), |callback| callback(handler, ctx, error))
    }

    pub(crate) fn call_text(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        text: &str,
    ) -> HandlerResult {
        match &self.text {
            Some(TextHandler::Buffered(callback)) => callback(handler, ctx, text),
            _ => Ok(()),
        }
    }

    pub(crate) fn call_text_stream(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        stream: TextStream,
    ) -> HandlerResult {
        match &self.text {
            Some(TextHandler::Streaming(callback)) => callback(handler, ctx, stream),
            _ => Ok(()),
        }
    }

    pub(crate) fn call_binary(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        data: &[u8],
    ) -> HandlerResult {
        match &self.binary {
            Some(BinaryHandler::Buffered(callback)) => callback(handler, ctx, data),
            _ => Ok(()),
        }
    }

    pub(crate) fn call_binary_stream(
        &self,
        handler: &mut H,
        ctx: &SessionContext,
        stream: MessageStream,
    ) -> HandlerResult {
        match &self.binary {
            Some(BinaryHandler::Streaming(callback)) => callback(handler, ctx, stream),
            _ => Ok(()),
        }
    }
}

impl<H> fmt::Debug for EventTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTable")
            .field("connect", &self.connect.is_some())
            .field("text", &self.discipline(MessageFamily::Text))
            .field("binary", &self.discipline(MessageFamily::Binary))
            .field("close", &self.close.is_some())
            .field("error", &self.error.is_some())
            .field("frame", &self.frame.is_some())
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// Builder for [`EventTable`].
///
/// Registering a buffered handler for a family replaces any streaming
/// handler for it and vice versa.
pub struct EventTableBuilder<H> {
    table: EventTable<H>,
}

impl<H> Default for EventTableBuilder<H> {
    fn default() -> Self {
        Self {
            table: EventTable {
                connect: None,
                text: None,
                binary: None,
                close: None,
                error: None,
                frame: None,
                overrides: None,
            },
        }
    }
}

impl<H> EventTableBuilder<H> {
    /// Register the connect callback.
    #[must_use]
    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.connect = Some(Box::new(callback));
        self
    }

    /// Receive complete text messages.
    #[must_use]
    pub fn on_text<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.text = Some(TextHandler::Buffered(Box::new(callback)));
        self
    }

    /// Receive text messages as streams.
    #[must_use]
    pub fn on_text_stream<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, TextStream) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.text = Some(TextHandler::Streaming(Box::new(callback)));
        self
    }

    /// Receive complete binary messages.
    #[must_use]
    pub fn on_binary<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, &[u8]) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.binary = Some(BinaryHandler::Buffered(Box::new(callback)));
        self
    }

    /// Receive binary messages as streams.
    #[must_use]
    pub fn on_binary_stream<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, MessageStream) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.binary = Some(BinaryHandler::Streaming(Box::new(callback)));
        self
    }

    /// Register the close callback.
    #[must_use]
    pub fn on_close<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, CloseCode, Option<&str>) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.table.close = Some(Box::new(callback));
        self
    }

    /// Register the error callback.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, &DispatchError) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.error = Some(Box::new(callback));
        self
    }

    /// Observe every inbound frame before it is dispatched.
    #[must_use]
    pub fn on_frame<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut H, &SessionContext, &Frame) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.frame = Some(Box::new(callback));
        self
    }

    /// Attach declarative policy overrides for this type.
    #[must_use]
    pub fn policy(mut self, overrides: PolicyOverrides) -> Self {
        self.table.overrides = Some(overrides);
        self
    }

    /// Finish the table.
    #[must_use]
    pub fn build(self) -> EventTable<H> { self.table }
}
