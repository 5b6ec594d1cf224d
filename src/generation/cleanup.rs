//! Browser resource teardown
//!
//! Runs on every exit path of a generation run. Failures here are logged and
//! collected, never raised.

use log::{debug, info, warn};

use super::errors::GenerateError;
use crate::engine::{AutomationEngine, BrowsingSession};
use crate::tab_pool::TabPool;

/// Result of cleanup operations
#[derive(Debug)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed; every entry is a [`GenerateError::Cleanup`]
    PartialFailure(Vec<GenerateError>),
}

impl CleanupResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Dispose every pooled tab, then the isolated session, then the engine
///
/// Each step runs even when an earlier one failed.
pub async fn teardown(
    pool: Option<&TabPool>,
    session: Option<&dyn BrowsingSession>,
    engine: &dyn AutomationEngine,
) -> CleanupResult {
    let mut errors = Vec::new();

    if let Some(pool) = pool {
        let disposed = pool.destroy_all().await;
        debug!(target: "bundleplan::cleanup", "Disposed {disposed} pooled tabs");
    }

    if let Some(session) = session {
        debug!(target: "bundleplan::cleanup", "Closing isolated browsing session");
        if let Err(e) = session.close().await {
            let err = GenerateError::Cleanup(format!("Session close failed: {e:#}"));
            warn!(target: "bundleplan::cleanup", "{err}");
            errors.push(err);
        }
    }

    debug!(target: "bundleplan::cleanup", "Closing browser");
    if let Err(e) = engine.close().await {
        let err = GenerateError::Cleanup(format!("Browser close failed: {e:#}"));
        warn!(target: "bundleplan::cleanup", "{err}");
        errors.push(err);
    } else {
        info!(target: "bundleplan::cleanup", "Browser closed");
    }

    if errors.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(errors)
    }
}
