//! Progress reporting abstraction for generation runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting
//! and provides a no-op implementation for callers that only want the plan.

use crate::generation::resource_guard::MemoryStats;
use crate::plan::BundleConfig;

/// Lifecycle phase of a generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// Session and tab pool are being created
    Starting,
    /// A collector is running (`index` is 1-based)
    Collecting {
        index: usize,
        total: usize,
        collector: String,
    },
    /// Shared modules are being moved into the common bundle
    Extracting,
    /// A termination request arrived and resources are being released
    Aborting { reason: String },
    /// Browser resources are being torn down
    TearingDown,
    /// The plan was produced
    Done,
    /// The run ended with an error
    Failed,
}

/// Trait for reporting generation progress at key lifecycle events
///
/// Implementations can forward updates to channels, a terminal UI, tests, etc.
pub trait ProgressReporter: Send + Sync {
    /// Report a phase transition
    fn report_phase(&self, phase: &RunPhase);

    /// Report that a collector returned its bundle
    fn report_collector_completed(&self, bundle: &BundleConfig, memory: &MemoryStats);

    /// Report an error that ended the run
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_phase(&self, _phase: &RunPhase) {}

    #[inline(always)]
    fn report_collector_completed(&self, _bundle: &BundleConfig, _memory: &MemoryStats) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}
