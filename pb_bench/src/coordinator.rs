use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use pb_bus::BusConnection;
use pb_bus::BusConnector;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::barrier::ReadinessBarrier;
use crate::config::RunConfig;
use crate::metrics::MetricsReporter;
use crate::metrics::RoleResult;
use crate::publisher::PublisherParams;
use crate::publisher::run_publisher;
use crate::subscriber::SubscriberParams;
use crate::subscriber::run_subscriber;
use crate::topic::Topic;

/// Granularity of the completion wait; the abort deadline is only
/// checked when a poll comes back empty
const COMPLETION_POLL: Duration = Duration::from_millis(100);

/// Settling pause between publisher readiness and subscriber launch
const SUBSCRIBER_LAUNCH_STAGGER: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Launching,
    AwaitingPublishers,
    LaunchingSubscribers,
    AwaitingCompletion,
    Done,
}

/// Outcome of a whole run
#[derive(Debug)]
pub struct RunSummary {
    /// Results of every role that finished cleanly, publishers first
    pub results: Vec<RoleResult>,
    /// True if the EXIT broadcast fired (deadline overrun or operator abort)
    pub aborted: bool,
}

type RoleHandle = std::thread::JoinHandle<pb_bus::Result<RoleResult>>;

/// Drives one benchmark run end to end.
///
/// The coordinator holds its own bus connection, subscribed to the
/// readiness and completion signals, and must be attached before any
/// role starts so no signal is lost. Publishers launch first and are
/// awaited so subscribers never attach ahead of a publisher that is
/// still connecting. The completion wait polls with a timeout; on
/// overrun (or when `running` is cleared by the operator) it broadcasts
/// EXIT exactly once and then keeps waiting for every role's done
/// acknowledgment. If the coordinator's own connection fails during
/// that wait, the error is logged, EXIT goes out best-effort, and the
/// run falls through to joining the roles — the spawned threads are
/// never abandoned. A role that dies before signalling done leaves the
/// wait hanging past the deadline; that degenerate case is accepted
/// rather than escalated to a hard kill.
pub fn run<C>(config: &RunConfig, connector: &C, running: &Arc<AtomicBool>) -> pb_bus::Result<RunSummary>
where
    C: BusConnector + Clone + Send + 'static,
{
    let reporter = MetricsReporter::new(config.message_size, config.rate_units);
    let barrier = ReadinessBarrier::new();

    let mut conn = connector.connect()?;
    conn.subscribe(Topic::PublisherReady.id())?;
    conn.subscribe(Topic::PublisherDone.id())?;
    conn.subscribe(Topic::SubscriberDone.id())?;

    let mut phase = Phase::Launching;
    debug!(?phase, publishers = config.publishers, "starting publisher roles");

    let publishers: Vec<RoleHandle> = (1..=config.publishers)
        .map(|role_id| {
            let params = PublisherParams {
                role_id,
                message_count: config.messages_per_publisher(),
                message_size: config.message_size,
                expected_subscribers: config.subscribers,
            };
            let connector = connector.clone();
            std::thread::spawn(move || run_publisher(&params, &connector, &reporter))
        })
        .collect();

    phase = Phase::AwaitingPublishers;
    debug!(?phase, "waiting for publisher readiness");
    barrier.wait_for(&mut conn, Topic::PublisherReady, config.publishers)?;

    phase = Phase::LaunchingSubscribers;
    debug!(?phase, subscribers = config.subscribers, "starting subscriber roles");
    std::thread::sleep(SUBSCRIBER_LAUNCH_STAGGER);

    let subscribers: Vec<RoleHandle> = (1..=config.subscribers)
        .map(|role_id| {
            let params = SubscriberParams { role_id, target: config.subscriber_target() };
            let connector = connector.clone();
            std::thread::spawn(move || run_subscriber(&params, &connector, &reporter))
        })
        .collect();

    phase = Phase::AwaitingCompletion;
    debug!(?phase, "waiting for completion signals");

    let deadline = Instant::now() + config.abort_timeout;
    let mut exit_sent = false;

    while !(barrier.reached(Topic::PublisherDone, config.publishers) && barrier.reached(Topic::SubscriberDone, config.subscribers)) {
        let received = match conn.receive(Some(COMPLETION_POLL)) {
            Ok(received) => received,
            Err(err) => {
                // Roles run on their own connections; nudge them with
                // EXIT if the bus still takes it, then join what we can
                error!("completion wait receive failed: {err}");
                if !exit_sent && conn.publish(Topic::Exit.id(), 0, &[]).is_ok() {
                    exit_sent = true;
                }
                break;
            }
        };

        match received {
            Some(msg) => {
                if let Some(topic) = Topic::from_id(msg.topic) {
                    barrier.observe(topic);
                }
            }
            None => {
                let overrun = Instant::now() >= deadline;
                let operator_abort = !running.load(Ordering::Relaxed);

                if !exit_sent && (overrun || operator_abort) {
                    if overrun {
                        warn!(timeout_secs = config.abort_timeout.as_secs(), "run overran its deadline");
                        println!("Test timeout! Sending exit signal...");
                    } else {
                        warn!("operator abort requested");
                        println!("Abort requested! Sending exit signal...");
                    }
                    // At most one EXIT per run; roles already stopping
                    // must not see a second one
                    conn.publish(Topic::Exit.id(), 0, &[])?;
                    exit_sent = true;
                }
            }
        }
    }

    phase = Phase::Done;
    debug!(?phase, "joining role threads");

    let mut results = Vec::with_capacity(config.publishers + config.subscribers);
    for handle in publishers.into_iter().chain(subscribers) {
        match handle.join() {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(err)) => error!("role failed: {err}"),
            Err(_) => error!("role thread panicked"),
        }
    }

    conn.disconnect()?;
    Ok(RunSummary { results, aborted: exit_sent })
}
