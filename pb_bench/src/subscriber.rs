use std::time::Duration;
use std::time::Instant;

use pb_bus::BusConnection;
use pb_bus::BusConnector;
use tracing::debug;

use crate::metrics::MetricsReporter;
use crate::metrics::RoleKind;
use crate::metrics::RoleResult;
use crate::topic::Topic;

#[derive(Debug, Clone)]
pub struct SubscriberParams {
    pub role_id: usize,
    /// DATA messages expected across all publishers' streams
    pub target: usize,
}

/// Subscriber lifecycle: connect, announce readiness, then count DATA
/// until the target is met or EXIT arrives.
///
/// The clock starts on the first DATA message and is bumped on every
/// arrival, so elapsed time covers `observed - 1` inter-arrival gaps and
/// excludes connection/setup jitter. Stopping short on EXIT is a normal
/// partial-completion outcome, not an error; the result records how far
/// the run got.
pub fn run_subscriber<C: BusConnector>(params: &SubscriberParams, connector: &C, reporter: &MetricsReporter) -> pb_bus::Result<RoleResult> {
    let mut conn = connector.connect()?;

    conn.subscribe(Topic::Data.id())?;
    conn.subscribe(Topic::Exit.id())?;
    conn.publish(Topic::SubscriberReady.id(), 0, &[])?;
    debug!(role_id = params.role_id, target = params.target, "subscriber ready");

    let mut observed = 0usize;
    let mut exit_requested = false;
    let mut start = None;
    let mut end = Instant::now();

    while observed < params.target && !exit_requested {
        let Some(msg) = conn.receive(None)? else { continue };

        match Topic::from_id(msg.topic) {
            Some(Topic::Data) => {
                if observed == 0 {
                    start = Some(Instant::now());
                }
                end = Instant::now();
                observed += 1;
            }
            // A second EXIT while already stopping changes nothing
            Some(Topic::Exit) => exit_requested = true,
            _ => {}
        }
    }

    conn.publish(Topic::SubscriberDone.id(), 0, &[])?;
    conn.disconnect()?;

    // Fewer than two arrivals leave no measurable interval
    let elapsed = match start {
        Some(start) if observed > 1 => end.duration_since(start),
        _ => Duration::ZERO,
    };

    let result = RoleResult {
        role_id: params.role_id,
        kind: RoleKind::Subscriber,
        messages_observed: observed,
        target: params.target,
        elapsed,
        complete: observed == params.target,
    };

    debug!(role_id = params.role_id, observed, complete = result.complete, "subscriber done");
    println!("{}", reporter.summary_line(&result));
    Ok(result)
}
