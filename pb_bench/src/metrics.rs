use std::fmt;
use std::time::Duration;

use pb_bus::FRAME_HEADER_SIZE;

/// Which lifecycle a role ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Publisher,
    Subscriber,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Publisher => write!(f, "Publisher"),
            RoleKind::Subscriber => write!(f, "Subscriber"),
        }
    }
}

/// One role's outcome, captured at the end of its run and never mutated
#[derive(Debug, Clone)]
pub struct RoleResult {
    pub role_id: usize,
    pub kind: RoleKind,
    pub messages_observed: usize,
    pub target: usize,
    pub elapsed: Duration,
    pub complete: bool,
}

/// Decimal megabytes vs binary mebibytes for the byte-rate column.
/// An explicit knob rather than a hidden constant, since the two
/// conventions disagree by ~5% at this scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateUnits {
    #[default]
    DecimalMb,
    BinaryMib,
}

impl RateUnits {
    pub const fn divisor(self) -> f64 {
        match self {
            RateUnits::DecimalMb => 1e6,
            RateUnits::BinaryMib => 1024.0 * 1024.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RateUnits::DecimalMb => "MB",
            RateUnits::BinaryMib => "MiB",
        }
    }
}

/// Derives throughput figures from a [`RoleResult`] and formats the
/// per-role summary line.
#[derive(Debug, Clone, Copy)]
pub struct MetricsReporter {
    message_size: usize,
    units: RateUnits,
}

impl MetricsReporter {
    pub fn new(message_size: usize, units: RateUnits) -> Self {
        Self { message_size, units }
    }

    /// Messages the rate is computed over. A publisher times the whole
    /// send loop, so all of them count. A subscriber only starts its
    /// clock on the first arrival, so its elapsed time spans
    /// `observed - 1` inter-arrival gaps and the first message is
    /// excluded from the rate. This keeps one-time connection jitter out
    /// of the steady-state figure.
    fn effective_messages(&self, result: &RoleResult) -> usize {
        match result.kind {
            RoleKind::Publisher => result.messages_observed,
            RoleKind::Subscriber => result.messages_observed.saturating_sub(1),
        }
    }

    /// Steady-state message rate; 0 when there were too few observations
    /// to define one
    pub fn messages_per_sec(&self, result: &RoleResult) -> f64 {
        let effective = self.effective_messages(result);
        let secs = result.elapsed.as_secs_f64();

        if effective == 0 || secs <= 0.0 { 0.0 } else { effective as f64 / secs }
    }

    /// Byte rate in the configured units, counting payload plus the wire
    /// header of every message
    pub fn bytes_rate(&self, result: &RoleResult) -> f64 {
        let per_message = (self.message_size + FRAME_HEADER_SIZE) as f64;
        self.messages_per_sec(result) * per_message / self.units.divisor()
    }

    /// Whole-percent completion against the role's target
    pub fn completion_pct(&self, result: &RoleResult) -> usize {
        if result.target == 0 { 100 } else { result.messages_observed * 100 / result.target }
    }

    /// The per-role summary line. Subscribers that fell short of target
    /// carry an inline completion percentage.
    pub fn summary_line(&self, result: &RoleResult) -> String {
        let rate = self.messages_per_sec(result) as u64;
        let bytes = self.bytes_rate(result);
        let secs = result.elapsed.as_secs_f64();
        let label = self.units.label();

        if result.complete {
            format!(
                "{}[{}] -> {} messages | {} messages/sec | {:.1} {}/sec | {:.6} sec",
                result.kind, result.role_id, result.messages_observed, rate, bytes, label, secs
            )
        } else {
            format!(
                "{}[{}] -> {} messages ({}%) | {} messages/sec | {:.1} {}/sec | {:.6} sec",
                result.kind,
                result.role_id,
                result.messages_observed,
                self.completion_pct(result),
                rate,
                bytes,
                label,
                secs
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn subscriber_result(observed: usize, target: usize, elapsed: Duration) -> RoleResult {
        RoleResult { role_id: 1, kind: RoleKind::Subscriber, messages_observed: observed, target, elapsed, complete: observed == target }
    }

    #[test]
    fn test_subscriber_rate_excludes_first_message() {
        let reporter = MetricsReporter::new(0, RateUnits::DecimalMb);
        let result = subscriber_result(1001, 1001, Duration::from_secs(1));

        // 1001 observed over 1000 inter-arrival gaps
        assert_eq!(reporter.messages_per_sec(&result), 1000.0);
    }

    #[test]
    fn test_publisher_rate_counts_all_messages() {
        let reporter = MetricsReporter::new(0, RateUnits::DecimalMb);
        let result = RoleResult {
            role_id: 1,
            kind: RoleKind::Publisher,
            messages_observed: 500,
            target: 500,
            elapsed: Duration::from_secs(1),
            complete: true,
        };

        assert_eq!(reporter.messages_per_sec(&result), 500.0);
    }

    #[test]
    fn test_zero_observed_reports_zero() {
        let reporter = MetricsReporter::new(128, RateUnits::DecimalMb);
        let result = subscriber_result(0, 1000, Duration::ZERO);

        assert_eq!(reporter.messages_per_sec(&result), 0.0);
        assert_eq!(reporter.bytes_rate(&result), 0.0);
        assert_eq!(reporter.completion_pct(&result), 0);
    }

    #[test]
    fn test_single_observation_reports_zero_rate() {
        let reporter = MetricsReporter::new(128, RateUnits::DecimalMb);
        let result = subscriber_result(1, 1000, Duration::ZERO);

        assert_eq!(reporter.messages_per_sec(&result), 0.0);
    }

    #[test]
    fn test_byte_rate_includes_header_overhead() {
        let reporter = MetricsReporter::new(90, RateUnits::DecimalMb);
        let result = subscriber_result(1001, 1001, Duration::from_secs(1));

        // 1000 msgs/sec * (90 + 10) bytes = 100_000 bytes/sec = 0.1 MB/sec
        assert!((reporter.bytes_rate(&result) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_zero_payload_still_counts_header() {
        let reporter = MetricsReporter::new(0, RateUnits::DecimalMb);
        let result = subscriber_result(1001, 1001, Duration::from_secs(1));

        // Header-only transfer: 1000 * 10 bytes/sec
        assert!((reporter.bytes_rate(&result) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_units_knob() {
        let result = subscriber_result(1001, 1001, Duration::from_secs(1));

        // 1000 msgs/sec of exactly one mebibyte on the wire each
        let size = 1024 * 1024 - pb_bus::FRAME_HEADER_SIZE;
        let mb = MetricsReporter::new(size, RateUnits::DecimalMb).bytes_rate(&result);
        let mib = MetricsReporter::new(size, RateUnits::BinaryMib).bytes_rate(&result);

        assert!((mb - 1048.576).abs() < 1e-6);
        assert!((mib - 1000.0).abs() < 1e-6);
        assert_eq!(RateUnits::DecimalMb.label(), "MB");
        assert_eq!(RateUnits::BinaryMib.label(), "MiB");
    }

    #[test]
    fn test_summary_line_complete() {
        let reporter = MetricsReporter::new(90, RateUnits::DecimalMb);
        let result = subscriber_result(1001, 1001, Duration::from_secs(1));

        assert_eq!(reporter.summary_line(&result), "Subscriber[1] -> 1001 messages | 1000 messages/sec | 0.1 MB/sec | 1.000000 sec");
    }

    #[test]
    fn test_summary_line_partial_has_percentage() {
        let reporter = MetricsReporter::new(90, RateUnits::DecimalMb);
        let result = subscriber_result(500, 1000, Duration::from_secs(1));

        let line = reporter.summary_line(&result);
        assert!(line.starts_with("Subscriber[1] -> 500 messages (50%)"), "unexpected line: {line}");
    }

    #[test]
    fn test_summary_line_zero_percent() {
        let reporter = MetricsReporter::new(90, RateUnits::DecimalMb);
        let result = subscriber_result(0, 1000, Duration::ZERO);

        let line = reporter.summary_line(&result);
        assert!(line.contains("(0%)"), "unexpected line: {line}");
    }

    proptest! {
        #[test]
        fn prop_rates_are_finite_and_non_negative(observed in 0usize..100_000, target in 1usize..100_000, millis in 0u64..10_000) {
            let reporter = MetricsReporter::new(128, RateUnits::DecimalMb);
            let result = subscriber_result(observed.min(target), target, Duration::from_millis(millis));

            let rate = reporter.messages_per_sec(&result);
            prop_assert!(rate.is_finite());
            prop_assert!(rate >= 0.0);
            prop_assert!(reporter.completion_pct(&result) <= 100);
        }
    }
}
