//! Listener-trait route to an event table.
//!
//! Types that prefer implementing a fixed interface over registering
//! closures implement [`WebSocketListener`] and obtain their table from
//! [`EventTable::for_listener`]. Every message is delivered buffered.

use super::{EventTable, SessionContext};
use crate::{
    close::CloseCode,
    error::{DispatchError, HandlerResult},
};

/// Fixed callback interface covering every event except raw frames.
pub trait WebSocketListener: Send + 'static {
    /// Connection established.
    fn on_websocket_connect(&mut self, ctx: &SessionContext) -> HandlerResult;

    /// Complete text message.
    fn on_websocket_text(&mut self, ctx: &SessionContext, text: &str) -> HandlerResult;

    /// Complete binary message.
    fn on_websocket_binary(&mut self, ctx: &SessionContext, data: &[u8]) -> HandlerResult;

    /// Peer sent CLOSE.
    fn on_websocket_close(
        &mut self,
        ctx: &SessionContext,
        code: CloseCode,
        reason: Option<&str>,
    ) -> HandlerResult;

    /// A failure was reported on the connection.
    fn on_websocket_error(&mut self, ctx: &SessionContext, error: &DispatchError)
    -> HandlerResult;
}

impl<H: WebSocketListener> EventTable<H> {
    /// Table routing every event to the [`WebSocketListener`] methods.
    #[must_use]
    pub fn for_listener() -> Self {
        EventTable::builder()
            .on_connect(|listener: &mut H, ctx: &SessionContext| listener.on_websocket_connect(ctx))
            .on_text(|listener: &mut H, ctx: &SessionContext, text: &str| {
                listener.on_websocket_text(ctx, text)
            })
            .on_binary(|listener: &mut H, ctx: &SessionContext, data: &[u8]| {
                listener.on_websocket_binary(ctx, data)
            })
            .on_close(
                |listener: &mut H, ctx: &SessionContext, code: CloseCode, reason: Option<&str>| {
                    listener.on_websocket_close(ctx, code, reason)
                },
            )
            .on_error(|listener: &mut H, ctx: &SessionContext, error: &DispatchError| {
                listener.on_websocket_error(ctx, error)
            })
            .build()
    }
}
