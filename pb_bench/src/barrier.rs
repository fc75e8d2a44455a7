use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use pb_bus::BusConnection;
use tracing::trace;

use crate::topic::Topic;

/// Counts readiness/completion signals observed on the bus.
///
/// The counters are monotone and reset only when the barrier is dropped
/// with its owner; in a well-formed run a class counter never exceeds the
/// configured population of that class. Waiting is just filtering the
/// caller's own inbox: matching signals are counted, everything else is
/// discarded.
#[derive(Debug, Default)]
pub struct ReadinessBarrier {
    counts: [AtomicUsize; 4],
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observed signal, returning the new count. Non-signal
    /// topics are ignored and report 0.
    pub fn observe(&self, topic: Topic) -> usize {
        match topic.signal_index() {
            Some(idx) => self.counts[idx].fetch_add(1, Ordering::SeqCst) + 1,
            None => 0,
        }
    }

    pub fn count(&self, topic: Topic) -> usize {
        topic.signal_index().map_or(0, |idx| self.counts[idx].load(Ordering::SeqCst))
    }

    pub fn reached(&self, topic: Topic, threshold: usize) -> bool {
        self.count(topic) >= threshold
    }

    /// Blocks on the connection until `threshold` signals matching
    /// `topic` have been observed. Other signal classes read while
    /// waiting are still counted, so a done signal racing ahead of the
    /// readiness wait is not lost; everything else is dropped on the
    /// floor.
    pub fn wait_for<C: BusConnection>(&self, conn: &mut C, topic: Topic, threshold: usize) -> pb_bus::Result<()> {
        while !self.reached(topic, threshold) {
            let Some(msg) = conn.receive(None)? else { continue };

            if let Some(seen) = Topic::from_id(msg.topic) {
                let count = self.observe(seen);
                if seen == topic {
                    trace!(?topic, count, threshold, "barrier signal");
                }
            }
        }
        Ok(())
    }
}
