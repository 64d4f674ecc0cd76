//! Per-connection event driver.
//!
//! [`EventDriver`] owns the application object for one connection. It
//! receives parsed frames in arrival order, reassembles fragmented messages,
//! invokes the callbacks registered in the application's
//! [`EventTable`] and closes the connection when dispatch fails.
//!
//! Every failure raised while a frame is handled, including a panicking
//! callback, is caught inside [`EventDriver::on_frame`] and turned into a
//! close; nothing propagates to the transport that feeds the driver.

mod termination;

use std::{any::type_name, fmt, sync::Arc};

use tracing::{debug, error, trace};

pub use self::termination::{MAX_REASON_BYTES, trim_reason};
use crate::{
    assembly::MessageAssembly,
    close::{CloseException, CloseInfo},
    connection::Connection,
    error::DispatchError,
    events::{
        Discipline,
        EventKind,
        EventTable,
        EventTableCache,
        SessionContext,
        WebSocketEndpoint,
    },
    frame::{Frame, MessageFamily, OpCode},
    metrics,
    panic::format_panic,
    policy::WebSocketPolicy,
    pool::{BufferPool, PooledBuffer},
    stream::MessageStream,
};

/// Message assembly and event dispatch for one connection.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use wsdriver::{
///     driver::EventDriver,
///     events::{EventTable, SessionContext},
///     frame::Frame,
///     policy::WebSocketPolicy,
///     pool::DefaultBufferPool,
/// };
///
/// #[derive(Default)]
/// struct Chat {
///     lines: Vec<String>,
/// }
///
/// let table = EventTable::builder()
///     .on_text(|chat: &mut Chat, _ctx: &SessionContext, text: &str| {
///         chat.lines.push(text.to_owned());
///         Ok(())
///     })
///     .build();
///
/// let mut driver = EventDriver::new(
///     Chat::default(),
///     Arc::new(table),
///     WebSocketPolicy::server(),
///     Arc::new(DefaultBufferPool::default()),
/// );
///
/// driver.on_frame(Frame::text("He").with_fin(false));
/// driver.on_frame(Frame::continuation("llo", true));
/// assert_eq!(driver.handler().lines, vec!["Hello".to_owned()]);
/// ```
pub struct EventDriver<H> {
    handler: H,
    events: Arc<EventTable<H>>,
    ctx: SessionContext,
    assembly: MessageAssembly,
}

impl<H> EventDriver<H> {
    /// Create a driver for `handler`.
    ///
    /// Policy overrides carried by `events` are applied to `policy` once,
    /// here; the effective policy is read-only afterwards.
    #[must_use]
    pub fn new(
        handler: H,
        events: Arc<EventTable<H>>,
        policy: WebSocketPolicy,
        pool: Arc<dyn BufferPool>,
    ) -> Self {
        let policy = match events.policy_overrides() {
            Some(overrides) => policy.with_overrides(overrides),
            None => policy,
        };
        Self {
            handler,
            events,
            ctx: SessionContext::new(policy),
            assembly: MessageAssembly::new(pool),
        }
    }

    /// Create a driver whose event table is resolved through `cache`.
    #[must_use]
    pub fn for_endpoint(
        handler: H,
        cache: &EventTableCache,
        policy: WebSocketPolicy,
        pool: Arc<dyn BufferPool>,
    ) -> Self
    where
        H: WebSocketEndpoint,
    {
        Self::new(handler, cache.get::<H>(), policy, pool)
    }

    /// Attach the transport handle used to send CLOSE frames.
    pub fn set_connection(&mut self, connection: Arc<dyn Connection>) {
        self.ctx.attach(connection);
    }

    /// Borrow the application object.
    #[must_use]
    pub const fn handler(&self) -> &H { &self.handler }

    /// Mutably borrow the application object.
    #[must_use]
    pub const fn handler_mut(&mut self) -> &mut H { &mut self.handler }

    /// Consume the driver, returning the application object.
    ///
    /// Any in-flight message is abandoned.
    #[must_use]
    pub fn into_handler(mut self) -> H {
        self.assembly.abandon();
        self.handler
    }

    /// Effective policy after overrides.
    #[must_use]
    pub const fn policy(&self) -> &WebSocketPolicy { self.ctx.policy() }

    /// Shared event table.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventTable<H>> { &self.events }

    /// Session context handed to callbacks.
    #[must_use]
    pub const fn context(&self) -> &SessionContext { &self.ctx }

    /// Family of the message currently being reassembled, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<MessageFamily> { self.assembly.in_flight() }

    /// Connection established: invoke the connect callback.
    pub fn on_connect(&mut self) {
        debug!(endpoint = type_name::<H>(), "connection established");
        let result = self.guarded(|driver| {
            driver
                .events
                .call_connect(&mut driver.handler, &driver.ctx)
                .map_err(DispatchError::from)
        });
        if let Err(error) = result {
            self.fail(error);
        }
    }

    /// Handle one inbound frame.
    ///
    /// Frames must be supplied in arrival order. Failures close the
    /// connection; the error callback observes them afterwards.
    pub fn on_frame(&mut self, frame: Frame) {
        metrics::inc_frames();
        debug!(
            endpoint = type_name::<H>(),
            opcode = %frame.opcode(),
            fin = frame.is_fin(),
            len = frame.payload().len(),
            "frame received"
        );
        if let Err(error) = self.guarded(|driver| driver.dispatch(frame)) {
            self.fail(error);
        }
    }

    /// A protocol failure detected outside the driver, such as by the frame
    /// parser, requests a close with a specific status.
    pub fn on_protocol_error(&mut self, close: CloseException) {
        debug!(
            endpoint = type_name::<H>(),
            code = %close.code(),
            reason = close.reason(),
            "protocol error reported"
        );
        self.fail(DispatchError::ProtocolClose(close));
    }

    /// Run `f`, converting a panic into [`DispatchError::Panic`].
    fn guarded<F>(&mut self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut Self) -> Result<(), DispatchError>,
    {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(self))) {
            Ok(result) => result,
            Err(payload) => {
                let message = format_panic(payload.as_ref()).to_string();
                error!(endpoint = type_name::<H>(), panic = %message, "event handler panicked");
                Err(DispatchError::Panic { message })
            }
        }
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), DispatchError> {
        self.events
            .call_frame(&mut self.handler, &self.ctx, &frame)?;

        match frame.opcode() {
            OpCode::Close => self.dispatch_close(&frame),
            OpCode::Ping | OpCode::Pong => Ok(()),
            OpCode::Text => self.dispatch_data(MessageFamily::Text, frame),
            OpCode::Binary => self.dispatch_data(MessageFamily::Binary, frame),
            OpCode::Continuation => match self.assembly.in_flight() {
                Some(family) => self.dispatch_data(family, frame),
                None => {
                    trace!("continuation frame with no message in flight ignored");
                    Ok(())
                }
            },
        }
    }

    fn dispatch_close(&mut self, frame: &Frame) -> Result<(), DispatchError> {
        if !self.events.is_registered(EventKind::Close) {
            return Ok(());
        }
        let info = CloseInfo::from_payload(frame.payload())?;
        self.events
            .call_close(&mut self.handler, &self.ctx, info.code(), info.reason())?;
        Ok(())
    }

    fn dispatch_data(&mut self, family: MessageFamily, frame: Frame) -> Result<(), DispatchError> {
        let Some(discipline) = self.events.discipline(family) else {
            trace!(%family, "no handler registered; frame discarded");
            return Ok(());
        };

        if let Some(in_flight) = self.assembly.in_flight()
            && in_flight != family
        {
            return Err(DispatchError::UnexpectedDataFrame {
                in_flight,
                received: frame.opcode(),
            });
        }

        let fin = frame.is_fin();
        match discipline {
            Discipline::Buffered => {
                let limit = self.ctx.policy().buffered_limit(family);
                match self
                    .assembly
                    .accept_buffered(family, frame.payload(), fin, limit)?
                {
                    Some(buffer) => self.deliver_buffered(family, &buffer),
                    None => Ok(()),
                }
            }
            Discipline::Streaming => {
                match self
                    .assembly
                    .accept_streaming(family, frame.into_payload(), fin)?
                {
                    Some(stream) => self.deliver_stream(family, stream),
                    None => Ok(()),
                }
            }
        }
    }

    /// Deliver a completed message. The buffer returns to the pool when the
    /// caller drops it, whatever the callback does.
    fn deliver_buffered(
        &mut self,
        family: MessageFamily,
        buffer: &PooledBuffer,
    ) -> Result<(), DispatchError> {
        metrics::inc_messages(family, Discipline::Buffered);
        match family {
            MessageFamily::Text => {
                let text = std::str::from_utf8(buffer.as_slice())
                    .map_err(|_| DispatchError::InvalidUtf8 { family })?;
                self.events.call_text(&mut self.handler, &self.ctx, text)?;
            }
            MessageFamily::Binary => {
                self.events
                    .call_binary(&mut self.handler, &self.ctx, buffer.as_slice())?;
            }
        }
        Ok(())
    }

    fn deliver_stream(
        &mut self,
        family: MessageFamily,
        stream: MessageStream,
    ) -> Result<(), DispatchError> {
        metrics::inc_messages(family, Discipline::Streaming);
        match family {
            MessageFamily::Text => {
                self.events
                    .call_text_stream(&mut self.handler, &self.ctx, stream.into_text())?;
            }
            MessageFamily::Binary => {
                self.events
                    .call_binary_stream(&mut self.handler, &self.ctx, stream)?;
            }
        }
        Ok(())
    }
}

impl<H> fmt::Debug for EventDriver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDriver")
            .field("endpoint", &type_name::<H>())
            .field("events", &self.events)
            .field("ctx", &self.ctx)
            .field("assembly", &self.assembly)
            .finish_non_exhaustive()
    }
}
