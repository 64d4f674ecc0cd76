#![cfg(feature = "metrics")]
//! Tests for `wsdriver` metrics.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use std::sync::Arc;

use rstest::rstest;
use wsdriver::{
    DefaultBufferPool,
    EventDriver,
    EventTable,
    Frame,
    MessageFamily,
    SessionContext,
    WebSocketPolicy,
    events::Discipline,
    metrics::{
        FRAMES_PROCESSED,
        MESSAGES_DELIVERED,
        POOLED_BUFFERS_OUTSTANDING,
        TERMINATIONS,
    },
};
use wsdriver_testing::{
    RecordingConnection,
    counter_value,
    debugging_recorder_setup,
    gauge_value,
};

fn driver() -> EventDriver<()> {
    let table = EventTable::builder()
        .on_text(|_: &mut (), _: &SessionContext, _: &str| Ok(()))
        .build();
    let mut driver = EventDriver::new(
        (),
        Arc::new(table),
        WebSocketPolicy::server().with_buffer_size(8),
        Arc::new(DefaultBufferPool::default()),
    );
    driver.set_connection(RecordingConnection::new());
    driver
}

#[test]
fn frames_and_messages_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut driver = driver();
        driver.on_frame(Frame::text("He").with_fin(false));
        driver.on_frame(Frame::continuation("llo", true));
    });

    let snapshot_frames = counter_value(&snapshotter, FRAMES_PROCESSED, &[]);
    assert_eq!(snapshot_frames, 2);
}

#[test]
fn delivered_messages_carry_family_and_discipline() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut driver = driver();
        driver.on_frame(Frame::text("one"));
        driver.on_frame(Frame::text("two"));
    });

    let delivered = counter_value(
        &snapshotter,
        MESSAGES_DELIVERED,
        &[
            ("family", MessageFamily::Text.as_str()),
            ("discipline", Discipline::Buffered.as_str()),
        ],
    );
    assert_eq!(delivered, 2);
}

#[rstest]
#[case(1)]
#[case(3)]
fn terminations_are_counted_by_code(#[case] failures: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut driver = driver();
        for _ in 0..failures {
            driver.on_frame(Frame::text("far too long for eight bytes"));
        }
    });

    let terminations = counter_value(&snapshotter, TERMINATIONS, &[("code", "1011")]);
    assert_eq!(terminations, failures);
}

#[test]
fn pooled_buffer_gauge_returns_to_zero() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut driver = driver();
        driver.on_frame(Frame::text("ab").with_fin(false));
        driver.on_frame(Frame::continuation("cd", true));
    });

    assert_eq!(gauge_value(&snapshotter, POOLED_BUFFERS_OUTSTANDING), Some(0.0));
}
