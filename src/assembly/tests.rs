//! Unit tests for the single-slot message assembler.

use std::sync::Arc;

use bytes::Bytes;
use rstest::{fixture, rstest};

use super::*;
use crate::{stream::TryChunk, test_helpers::CountingPool};

struct Harness {
    pool: Arc<CountingPool>,
    assembly: MessageAssembly,
}

#[fixture]
fn harness() -> Harness {
    let pool = Arc::new(CountingPool::default());
    let assembly = MessageAssembly::new(Arc::clone(&pool) as Arc<dyn BufferPool>);
    Harness { pool, assembly }
}

#[rstest]
fn buffered_fragments_concatenate_in_order(mut harness: Harness) {
    for part in [&b"a"[..], b"bc", b""] {
        let out = harness
            .assembly
            .accept_buffered(MessageFamily::Binary, part, false, 16)
            .expect("fragment fits");
        assert!(out.is_none());
        assert_eq!(harness.assembly.in_flight(), Some(MessageFamily::Binary));
    }
    let complete = harness
        .assembly
        .accept_buffered(MessageFamily::Binary, b"d", true, 16)
        .expect("fits")
        .expect("complete on fin");

    assert_eq!(complete.as_slice(), b"abcd");
    assert!(harness.assembly.is_idle());
    assert_eq!(harness.pool.acquired(), 1);
    assert_eq!(harness.pool.released(), 0);
    drop(complete);
    assert_eq!(harness.pool.released(), 1);
}

#[rstest]
fn oversized_message_releases_buffer_and_clears_slot(mut harness: Harness) {
    harness
        .assembly
        .accept_buffered(MessageFamily::Text, b"1234", false, 6)
        .expect("first fragment fits");

    let err = harness
        .assembly
        .accept_buffered(MessageFamily::Text, b"567", false, 6)
        .expect_err("seven bytes exceed six");

    assert!(matches!(
        err,
        DispatchError::MessageTooLarge {
            family: MessageFamily::Text,
            attempted: 7,
            limit: 6,
        }
    ));
    assert!(harness.assembly.is_idle());
    assert_eq!(harness.pool.acquired(), 1);
    assert_eq!(harness.pool.released(), 1);
}

#[rstest]
fn limit_is_fixed_by_first_fragment(mut harness: Harness) {
    harness
        .assembly
        .accept_buffered(MessageFamily::Binary, b"ab", false, 3)
        .expect("fits");
    let err = harness
        .assembly
        .accept_buffered(MessageFamily::Binary, b"cd", true, 1024)
        .expect_err("later limit is ignored");
    assert!(matches!(err, DispatchError::MessageTooLarge { limit: 3, .. }));
}

#[rstest]
fn other_family_is_rejected_without_losing_slot(mut harness: Harness) {
    harness
        .assembly
        .accept_buffered(MessageFamily::Text, b"He", false, 16)
        .expect("fits");

    let err = harness
        .assembly
        .accept_buffered(MessageFamily::Binary, b"x", true, 16)
        .expect_err("binary while text in flight");
    assert!(matches!(
        err,
        DispatchError::UnexpectedDataFrame {
            in_flight: MessageFamily::Text,
            received: OpCode::Binary,
        }
    ));
    assert_eq!(harness.assembly.in_flight(), Some(MessageFamily::Text));
    assert_eq!(harness.pool.acquired(), 1);
}

#[rstest]
fn streaming_opens_once_and_finishes_on_fin(mut harness: Harness) {
    let mut stream = harness
        .assembly
        .accept_streaming(MessageFamily::Binary, Bytes::from_static(b"one"), false)
        .expect("accepted")
        .expect("first fragment opens the stream");
    assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"one")));

    let again = harness
        .assembly
        .accept_streaming(MessageFamily::Binary, Bytes::from_static(b"two"), true)
        .expect("accepted");
    assert!(again.is_none());
    assert!(harness.assembly.is_idle());

    assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"two")));
    assert_eq!(stream.try_next_chunk(), TryChunk::Finished);
    assert_eq!(harness.pool.acquired(), 0);
}

#[rstest]
fn single_frame_stream_is_already_finished(mut harness: Harness) {
    let mut stream = harness
        .assembly
        .accept_streaming(MessageFamily::Text, Bytes::from_static(b"hi"), true)
        .expect("accepted")
        .expect("stream opened");
    assert!(harness.assembly.is_idle());
    assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"hi")));
    assert_eq!(stream.try_next_chunk(), TryChunk::Finished);
}

#[rstest]
fn abandon_releases_buffer(mut harness: Harness) {
    harness
        .assembly
        .accept_buffered(MessageFamily::Text, b"partial", false, 64)
        .expect("fits");
    harness.assembly.abandon();
    assert!(harness.assembly.is_idle());
    assert_eq!(harness.pool.released(), 1);

    harness.assembly.abandon();
    assert_eq!(harness.pool.released(), 1);
}

#[rstest]
fn abandon_aborts_stream(mut harness: Harness) {
    let mut stream = harness
        .assembly
        .accept_streaming(MessageFamily::Binary, Bytes::from_static(b"x"), false)
        .expect("accepted")
        .expect("stream opened");
    harness.assembly.abandon();
    assert!(harness.assembly.is_idle());
    assert_eq!(stream.try_next_chunk(), TryChunk::Ready(Bytes::from_static(b"x")));
    assert_eq!(stream.try_next_chunk(), TryChunk::Aborted);
}
