//! # pb_bench
//!
//! Throughput benchmark core for a pub/sub message bus.
//!
//! The coordinator launches cohorts of publisher and subscriber roles
//! against a shared bus endpoint, synchronises them with in-band control
//! signals, and reports per-role throughput. All cross-role coordination
//! travels over the bus itself; the only shared memory is the readiness
//! counters.

pub mod barrier;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod metrics;
pub mod publisher;
pub mod subscriber;
pub mod topic;

pub use barrier::ReadinessBarrier;
pub use config::CliAction;
pub use config::RunConfig;
pub use config::parse_args;
pub use coordinator::RunSummary;
pub use errors::ConfigError;
pub use metrics::MetricsReporter;
pub use metrics::RateUnits;
pub use metrics::RoleKind;
pub use metrics::RoleResult;
pub use topic::Topic;
