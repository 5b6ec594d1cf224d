//! In-flight request accounting for network-idle detection
//!
//! Fed from CDP `Network.requestWillBeSent`, `Network.loadingFinished` and
//! `Network.loadingFailed`. The network is idle once nothing is in flight and
//! nothing started or settled for a quiet window.

use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct NetworkActivity {
    in_flight: HashSet<String>,
    last_change: Instant,
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self {
            in_flight: HashSet::new(),
            last_change: Instant::now(),
        }
    }
}

impl NetworkActivity {
    /// A redirect reuses the request id, so it stays a single entry
    pub fn request_started(&mut self, request_id: &str, now: Instant) {
        self.in_flight.insert(request_id.to_string());
        self.last_change = now;
    }

    /// Finished or failed; unknown ids still count as activity
    pub fn request_settled(&mut self, request_id: &str, now: Instant) {
        self.in_flight.remove(request_id);
        self.last_change = now;
    }

    /// Forget requests of the previous document before a navigation
    pub fn reset(&mut self, now: Instant) {
        self.in_flight.clear();
        self.last_change = now;
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn is_idle(&self, now: Instant, window: Duration) -> bool {
        self.in_flight.is_empty() && now.saturating_duration_since(self.last_change) >= window
    }
}
