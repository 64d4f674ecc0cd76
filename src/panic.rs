//! Formatting for panic payloads caught at the dispatch boundary.

use std::{any::Any, fmt};

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to a placeholder otherwise.
///
/// ```
/// use wsdriver::panic::format_panic;
///
/// let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
/// assert_eq!(format_panic(payload.as_ref()).to_string(), "boom");
/// ```
#[derive(Clone, Copy)]
#[must_use]
pub struct PanicMessage<'a>(&'a (dyn Any + Send));

impl fmt::Display for PanicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            f.write_str("<non-string panic payload>")
        }
    }
}

impl fmt::Debug for PanicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicMessage")
            .field(&self.to_string())
            .finish()
    }
}

/// Create a [`PanicMessage`] for the given payload.
pub fn format_panic(panic: &(dyn Any + Send)) -> PanicMessage<'_> { PanicMessage(panic) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_owned_and_static_strings() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let borrowed: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(format_panic(owned.as_ref()).to_string(), "owned boom");
        assert_eq!(format_panic(borrowed.as_ref()).to_string(), "static boom");
    }

    #[test]
    fn other_payloads_get_placeholder() {
        let payload: Box<dyn Any + Send> = Box::new(5_u32);
        assert_eq!(
            format_panic(payload.as_ref()).to_string(),
            "<non-string panic payload>"
        );
    }

    #[test]
    fn caught_panic_message_is_recovered() {
        let caught = std::panic::catch_unwind(|| panic!("handler exploded: {}", 42))
            .expect_err("closure panics");
        assert_eq!(format_panic(caught.as_ref()).to_string(), "handler exploded: 42");
    }
}
