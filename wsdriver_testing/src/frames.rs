//! Builders for fragmented frame sequences.

use bytes::Bytes;
use wsdriver::{Frame, OpCode};

/// One message split into the given parts.
///
/// The first frame carries `opcode`, the rest are continuations, and only
/// the last has FIN set. An empty `parts` yields a single empty final frame.
#[must_use]
pub fn fragments<P: AsRef<[u8]>>(opcode: OpCode, parts: &[P]) -> Vec<Frame> {
    if parts.is_empty() {
        return vec![Frame::new(opcode, true, Bytes::new())];
    }
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let frame_opcode = if index == 0 {
                opcode
            } else {
                OpCode::Continuation
            };
            Frame::new(
                frame_opcode,
                index == last,
                Bytes::copy_from_slice(part.as_ref()),
            )
        })
        .collect()
}

/// One message split into frames of at most `size` bytes.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn fragments_by_size(opcode: OpCode, message: &[u8], size: usize) -> Vec<Frame> {
    assert!(size > 0, "fragment size must be non-zero");
    let parts: Vec<&[u8]> = message.chunks(size).collect();
    fragments(opcode, &parts)
}
