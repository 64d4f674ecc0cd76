//! Closing the connection after a failure.

use std::any::type_name;

use tracing::{debug, error, warn};

use super::EventDriver;
use crate::{
    close::CloseCode,
    error::DispatchError,
    frame::MAX_CONTROL_PAYLOAD,
    metrics,
    panic::format_panic,
};

/// Longest close reason that fits a control frame after the status code.
pub const MAX_REASON_BYTES: usize = MAX_CONTROL_PAYLOAD - 2;

/// Shorten `reason` to at most [`MAX_REASON_BYTES`] bytes without splitting
/// a character.
///
/// ```
/// use wsdriver::driver::{MAX_REASON_BYTES, trim_reason};
///
/// assert_eq!(trim_reason("short"), "short");
/// let long = "é".repeat(100);
/// let trimmed = trim_reason(&long);
/// assert!(trimmed.len() <= MAX_REASON_BYTES);
/// assert!(long.starts_with(trimmed));
/// ```
#[must_use]
pub fn trim_reason(reason: &str) -> &str {
    if reason.len() <= MAX_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

impl<H> EventDriver<H> {
    /// Close the connection for `error`, then report it to the error callback.
    pub(super) fn fail(&mut self, error: DispatchError) {
        if let DispatchError::ProtocolClose(_) = &error {
            debug!(endpoint = type_name::<H>(), error = %error, "closing connection on request");
        } else {
            warn!(
                endpoint = type_name::<H>(),
                kind = error.kind_name(),
                error = %error,
                "unhandled error (closing connection)"
            );
        }

        self.assembly.abandon();
        let (code, reason) = error.close_status(self.ctx.policy().behavior());
        self.terminate(code, reason);
        self.notify_error(&error);
    }

    /// Send a CLOSE frame. Transport failures are logged and swallowed.
    fn terminate(&self, code: CloseCode, reason: &str) {
        metrics::inc_terminations(code);
        let reason = trim_reason(reason);
        let Some(connection) = self.ctx.connection() else {
            warn!(%code, reason, "no connection attached; close not sent");
            return;
        };
        debug!(%code, reason, "terminating connection");
        if let Err(e) = connection.close(code, reason) {
            debug!(%code, error = %e, "failed to send close frame");
        }
    }

    fn notify_error(&mut self, error: &DispatchError) {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.events.call_error(&mut self.handler, &self.ctx, error)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => {
                warn!(endpoint = type_name::<H>(), failure = %failure, "error callback failed");
            }
            Err(payload) => {
                error!(
                    endpoint = type_name::<H>(),
                    panic = %format_panic(payload.as_ref()),
                    "error callback panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "")]
    #[case("bye", "bye")]
    fn short_reasons_are_untouched(#[case] reason: &str, #[case] expected: &str) {
        assert_eq!(trim_reason(reason), expected);
    }

    #[test]
    fn ascii_reason_is_cut_at_limit() {
        let reason = "x".repeat(200);
        assert_eq!(trim_reason(&reason).len(), MAX_REASON_BYTES);
    }

    #[test]
    fn multibyte_reason_is_cut_on_char_boundary() {
        // 'é' is two bytes; 123 is odd so the last whole char ends at 122.
        let reason = "é".repeat(80);
        let trimmed = trim_reason(&reason);
        assert_eq!(trimmed.len(), 122);
        assert!(trimmed.chars().all(|c| c == 'é'));
    }
}
