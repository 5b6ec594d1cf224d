//! Per-collector page activity log
//!
//! Console output, page errors and failed requests are logged live and
//! buffered together with every response. The buffer is dumped only when the
//! collector fails.

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::engine::{PageEvent, PageEventSink};
use crate::utils::constants::PAGE_LOG_NOISE_FRAGMENT;

#[derive(Debug, Clone, Default)]
pub struct PageLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl PageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink to subscribe on the collector's tab
    #[must_use]
    pub fn sink(&self) -> PageEventSink {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |event: PageEvent| {
            let line = match &event {
                PageEvent::Console { level, text } => {
                    info!(target: "bundleplan::page", "{level} {text}");
                    format!("{level} {text}")
                }
                PageEvent::PageError { message } => {
                    error!(target: "bundleplan::page", "PAGE ERROR: {message}");
                    format!("PAGE ERROR: {message}")
                }
                PageEvent::RequestFailed { url, error } => {
                    warn!(target: "bundleplan::page", "REQUEST FAILED: {error} {url}");
                    format!("REQUEST FAILED: {error} {url}")
                }
                PageEvent::Response { status, url } => format!("RESPONSE {status} {url}"),
            };
            entries.lock().push(line);
        })
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Write the buffered activity for a failed bundle, minus product image noise
    pub fn dump(&self, bundle: &str) {
        error!(target: "bundleplan::page", "{bundle} page was terminated. Page activity follows.");
        for line in self
            .entries
            .lock()
            .iter()
            .filter(|line| !line.contains(PAGE_LOG_NOISE_FRAGMENT))
        {
            info!(target: "bundleplan::page", "{line}");
        }
    }
}
