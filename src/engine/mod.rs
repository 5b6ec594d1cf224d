//! Browser automation seam
//!
//! The generator only talks to the browser through these traits. `chrome`
//! implements them over chromiumoxide; tests substitute in-memory doubles.

pub mod chrome;
pub mod network_idle;
pub mod request_policy;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::config::Credentials;

pub use chrome::{ChromeEngine, LaunchOptions};
pub use network_idle::NetworkActivity;
pub use request_policy::RequestBlockPolicy;

/// Boxed future returned by every engine operation
pub type EngineFuture<'a, T> = BoxFuture<'a, anyhow::Result<T>>;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitCondition {
    /// The `load` event fired
    Load,
    /// The document finished parsing
    DomContentLoaded,
    /// `load` fired and no new resources were requested for a short window
    #[default]
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateOptions {
    pub wait_until: WaitCondition,
    /// Overrides the tab's default navigation timeout; `None` falls back to it
    pub timeout: Option<Duration>,
}

impl NavigateOptions {
    #[must_use]
    pub fn new(wait_until: WaitCondition) -> Self {
        Self {
            wait_until,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Page activity forwarded to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Console { level: String, text: String },
    PageError { message: String },
    RequestFailed { url: String, error: String },
    Response { status: i64, url: String },
}

pub type PageEventSink = Arc<dyn Fn(PageEvent) + Send + Sync>;

/// A single browser tab
pub trait PageHandle: Send + Sync {
    fn navigate<'a>(&'a self, url: &'a str, options: NavigateOptions) -> EngineFuture<'a, ()>;

    /// Run a script in the page, awaiting it if it returns a promise
    fn evaluate<'a>(&'a self, script: &'a str) -> EngineFuture<'a, serde_json::Value>;

    /// Save a full-page PNG
    fn screenshot<'a>(&'a self, path: &'a Path) -> EngineFuture<'a, ()>;

    /// `None` means navigations are unbounded
    fn set_default_navigation_timeout(&self, timeout: Option<Duration>);

    fn default_navigation_timeout(&self) -> Option<Duration>;

    /// Send HTTP basic credentials with every request from this tab
    fn authenticate<'a>(&'a self, credentials: &'a Credentials) -> EngineFuture<'a, ()>;

    /// Abort requests whose URL matches the policy
    fn block_requests(&self, policy: Arc<RequestBlockPolicy>) -> EngineFuture<'_, ()>;

    fn subscribe(&self, sink: PageEventSink) -> EngineFuture<'_, ()>;

    /// Remove every subscription and request interception
    fn detach_listeners(&self) -> EngineFuture<'_, ()>;

    fn close(&self) -> EngineFuture<'_, ()>;

    fn is_closed(&self) -> bool;
}

/// An isolated browsing context; tabs opened in it share no cookies or storage
/// with any other session
pub trait BrowsingSession: Send + Sync {
    fn new_tab(&self) -> EngineFuture<'_, Arc<dyn PageHandle>>;

    fn close(&self) -> EngineFuture<'_, ()>;
}

/// A running browser
pub trait AutomationEngine: Send + Sync {
    fn new_isolated_session(&self) -> EngineFuture<'_, Arc<dyn BrowsingSession>>;

    fn close(&self) -> EngineFuture<'_, ()>;
}
