use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;
use pb_bus::BusConnection;
use pb_bus::BusConnector;
use tracing::debug;

use crate::barrier::ReadinessBarrier;
use crate::metrics::MetricsReporter;
use crate::metrics::RoleKind;
use crate::metrics::RoleResult;
use crate::topic::Topic;

/// Pause between the last send and the done signal, so in-flight DATA
/// drains before anyone reacts to the publisher finishing
const DONE_SIGNAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PublisherParams {
    pub role_id: usize,
    pub message_count: usize,
    pub message_size: usize,
    pub expected_subscribers: usize,
}

/// Deterministic payload pattern: byte i = i mod 128
pub fn build_payload(size: usize) -> Bytes {
    (0..size).map(|i| (i % 128) as u8).collect::<Vec<u8>>().into()
}

/// Publisher lifecycle: connect, announce readiness, hold until every
/// expected subscriber has announced itself, then blast the payload
/// `message_count` times back to back and time the send loop.
///
/// Readiness is counted, not identity-checked; a duplicate signal would
/// stand in for a missing subscriber. Note the readiness signal also
/// races the bus-side activation of the subscription it advertises, so a
/// transport without order guarantees between control and data can still
/// lose leading DATA messages.
pub fn run_publisher<C: BusConnector>(params: &PublisherParams, connector: &C, reporter: &MetricsReporter) -> pb_bus::Result<RoleResult> {
    let mut conn = connector.connect()?;

    conn.subscribe(Topic::Exit.id())?;
    conn.subscribe(Topic::SubscriberReady.id())?;
    conn.publish(Topic::PublisherReady.id(), 0, &[])?;
    debug!(role_id = params.role_id, "publisher ready");

    let barrier = ReadinessBarrier::new();
    barrier.wait_for(&mut conn, Topic::SubscriberReady, params.expected_subscribers)?;
    debug!(role_id = params.role_id, subscribers = params.expected_subscribers, "all subscribers attached");

    let payload = build_payload(params.message_size);

    let start = Instant::now();
    for _ in 0..params.message_count {
        conn.publish(Topic::Data.id(), 0, &payload)?;
    }
    let elapsed = start.elapsed();

    std::thread::sleep(DONE_SIGNAL_DELAY);
    conn.publish(Topic::PublisherDone.id(), 0, &[])?;
    conn.disconnect()?;

    // A publisher measures send completion, never delivery
    let result = RoleResult {
        role_id: params.role_id,
        kind: RoleKind::Publisher,
        messages_observed: params.message_count,
        target: params.message_count,
        elapsed,
        complete: true,
    };

    println!("{}", reporter.summary_line(&result));
    Ok(result)
}
