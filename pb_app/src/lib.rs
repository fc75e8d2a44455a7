//! # pb_app
//!
//! Process-level plumbing for the benchmark binary

pub mod shutdown;
pub mod tracing_setup;
