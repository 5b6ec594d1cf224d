//! Automation engine backed by a Chrome/Chromium instance over CDP

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use log::{debug, info, trace};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use super::network_idle::NetworkActivity;
use super::{
    AutomationEngine, BrowsingSession, EngineFuture, NavigateOptions, PageEvent, PageEventSink,
    PageHandle, RequestBlockPolicy, WaitCondition,
};
use crate::browser_setup::launch_browser;
use crate::config::{Credentials, GenerationConfig};
use crate::utils::constants::{
    CDP_COMMAND_SLACK, DEFAULT_COLLECTOR_TIMEOUT, NETWORK_IDLE_WINDOW, VIEWPORT_HEIGHT,
    VIEWPORT_WIDTH,
};

const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    /// Deadline chromiumoxide applies to every CDP command, navigations and
    /// long-running `Runtime.evaluate` calls included
    pub command_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            command_timeout: DEFAULT_COLLECTOR_TIMEOUT + CDP_COMMAND_SLACK,
        }
    }
}

impl LaunchOptions {
    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            headless: config.headless(),
            executable: config.chrome_executable().cloned(),
            command_timeout: config.cdp_command_timeout(),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct ChromeEngine {
    browser: Arc<tokio::sync::Mutex<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    profile: Mutex<Option<TempDir>>,
    closed: AtomicBool,
}

impl ChromeEngine {
    /// Find or download a browser and launch it with a throwaway profile
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let profile = tempfile::Builder::new()
            .prefix("kodegen_bundleplan_")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        let (browser, handler) = launch_browser(
            options.headless,
            options.executable.as_deref(),
            profile.path(),
            options.command_timeout,
        )
        .await?;

        Ok(Self {
            browser: Arc::new(tokio::sync::Mutex::new(browser)),
            handler: Mutex::new(Some(handler)),
            profile: Mutex::new(Some(profile)),
            closed: AtomicBool::new(false),
        })
    }
}

impl AutomationEngine for ChromeEngine {
    fn new_isolated_session(&self) -> EngineFuture<'_, Arc<dyn BrowsingSession>> {
        Box::pin(async move {
            let response = self
                .browser
                .lock()
                .await
                .execute(CreateBrowserContextParams::default())
                .await
                .context("Failed to create browser context")?;
            let context_id = response.result.browser_context_id.clone();
            debug!("Created isolated browser context {context_id:?}");

            let session: Arc<dyn BrowsingSession> = Arc::new(ChromeSession {
                browser: Arc::clone(&self.browser),
                context_id,
                closed: AtomicBool::new(false),
            });
            Ok(session)
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            let mut browser = self.browser.lock().await;
            let close_result = browser.close().await.map(|_| ());
            // Wait for the process to exit so the profile can be removed
            let wait_result = browser.wait().await;
            drop(browser);

            if let Some(handler) = self.handler.lock().take() {
                handler.abort();
            }
            if let Some(profile) = self.profile.lock().take()
                && let Err(e) = profile.close()
            {
                debug!("Failed to remove browser profile directory: {e}");
            }

            close_result.context("Failed to close browser")?;
            wait_result.context("Failed to wait for browser exit")?;
            Ok(())
        })
    }
}

// =============================================================================
// Session
// =============================================================================

struct ChromeSession {
    browser: Arc<tokio::sync::Mutex<Browser>>,
    context_id: BrowserContextId,
    closed: AtomicBool,
}

impl BrowsingSession for ChromeSession {
    fn new_tab(&self) -> EngineFuture<'_, Arc<dyn PageHandle>> {
        Box::pin(async move {
            if self.closed.load(Ordering::SeqCst) {
                return Err(anyhow!("Browsing session is closed"));
            }

            let params = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(self.context_id.clone())
                .build()
                .map_err(anyhow::Error::msg)?;
            let page = self
                .browser
                .lock()
                .await
                .new_page(params)
                .await
                .context("Failed to open tab")?;

            page.execute(
                SetDeviceMetricsOverrideParams::builder()
                    .width(i64::from(VIEWPORT_WIDTH))
                    .height(i64::from(VIEWPORT_HEIGHT))
                    .device_scale_factor(1.0)
                    .mobile(true)
                    .build()
                    .map_err(anyhow::Error::msg)?,
            )
            .await?;

            let tab: Arc<dyn PageHandle> = Arc::new(ChromeTab::open(page).await?);
            Ok(tab)
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            self.browser
                .lock()
                .await
                .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
                .await
                .context("Failed to dispose browser context")?;
            Ok(())
        })
    }
}

// =============================================================================
// Tab
// =============================================================================

struct ChromeTab {
    page: Page,
    default_navigation_timeout: Mutex<Option<Duration>>,
    /// Subscriber and interception tasks; removed by `detach_listeners`
    listeners: Mutex<Vec<JoinHandle<()>>>,
    /// Request accounting for network-idle waits; lives as long as the tab
    network: Arc<Mutex<NetworkActivity>>,
    network_task: JoinHandle<()>,
    intercepting: AtomicBool,
    closed: AtomicBool,
}

impl ChromeTab {
    /// Wrap a fresh page and start tracking its requests
    async fn open(page: Page) -> Result<Self> {
        let mut started = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut finished = page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = page.event_listener::<EventLoadingFailed>().await?;

        let network = Arc::new(Mutex::new(NetworkActivity::default()));
        let activity = Arc::clone(&network);
        let network_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = started.next() => {
                        activity.lock().request_started(event.request_id.inner(), Instant::now());
                    }
                    Some(event) = finished.next() => {
                        activity.lock().request_settled(event.request_id.inner(), Instant::now());
                    }
                    Some(event) = failed.next() => {
                        activity.lock().request_settled(event.request_id.inner(), Instant::now());
                    }
                    else => break,
                }
            }
        });

        Ok(Self {
            page,
            default_navigation_timeout: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            network,
            network_task,
            intercepting: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Wait until no request has been in flight for the idle window
    async fn wait_for_network_idle(&self) {
        loop {
            let idle = {
                let activity = self.network.lock();
                trace!("{} requests in flight", activity.in_flight());
                activity.is_idle(Instant::now(), NETWORK_IDLE_WINDOW)
            };
            if idle {
                return;
            }
            tokio::time::sleep(NETWORK_IDLE_POLL).await;
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        self.listeners.lock().push(handle);
    }
}

impl Drop for ChromeTab {
    fn drop(&mut self) {
        self.network_task.abort();
        for handle in self.listeners.get_mut().drain(..) {
            handle.abort();
        }
    }
}

impl PageHandle for ChromeTab {
    fn navigate<'a>(&'a self, url: &'a str, options: NavigateOptions) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            let timeout = options.timeout.or(self.default_navigation_timeout());

            // goto resolves on `load`, which also covers DOMContentLoaded
            let navigation = async {
                self.network.lock().reset(Instant::now());
                self.page.goto(url).await?;
                if options.wait_until == WaitCondition::NetworkIdle {
                    self.wait_for_network_idle().await;
                }
                Ok::<_, anyhow::Error>(())
            };

            match timeout {
                Some(limit) => tokio::time::timeout(limit, navigation)
                    .await
                    .map_err(|_| anyhow!("Navigation to {url} timed out after {limit:?}"))?,
                None => navigation.await,
            }
        })
    }

    fn evaluate<'a>(&'a self, script: &'a str) -> EngineFuture<'a, serde_json::Value> {
        Box::pin(async move {
            let result = self.page.evaluate_expression(script.to_string()).await?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        })
    }

    fn screenshot<'a>(&'a self, path: &'a Path) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let params = CaptureScreenshotParams {
                format: Some(CaptureScreenshotFormat::Png),
                capture_beyond_viewport: Some(true),
                ..Default::default()
            };
            let data = self
                .page
                .screenshot(params)
                .await
                .map_err(|e| anyhow!("Failed to capture screenshot: {e}"))?;
            tokio::fs::write(path, data).await?;
            info!("Screenshot saved to {}", path.display());
            Ok(())
        })
    }

    fn set_default_navigation_timeout(&self, timeout: Option<Duration>) {
        *self.default_navigation_timeout.lock() = timeout;
    }

    fn default_navigation_timeout(&self) -> Option<Duration> {
        *self.default_navigation_timeout.lock()
    }

    fn authenticate<'a>(&'a self, credentials: &'a Credentials) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            let token = STANDARD.encode(format!(
                "{}:{}",
                credentials.username, credentials.password
            ));
            let headers = Headers::new(serde_json::json!({
                "Authorization": format!("Basic {token}"),
            }));
            self.page
                .execute(SetExtraHttpHeadersParams::new(headers))
                .await
                .context("Failed to set authorization header")?;
            Ok(())
        })
    }

    fn block_requests(&self, policy: Arc<RequestBlockPolicy>) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            let mut paused = self.page.event_listener::<EventRequestPaused>().await?;
            self.page.execute(fetch::EnableParams::default()).await?;
            self.intercepting.store(true, Ordering::SeqCst);

            let page = self.page.clone();
            self.track(tokio::spawn(async move {
                while let Some(event) = paused.next().await {
                    let url = &event.request.url;
                    let outcome = if policy.is_blocked(url) {
                        info!("Blocked request: {url}");
                        page.execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ())
                    } else {
                        page.execute(ContinueRequestParams::new(event.request_id.clone()))
                            .await
                            .map(|_| ())
                    };
                    if let Err(e) = outcome {
                        trace!("Failed to answer paused request {url}: {e}");
                    }
                }
            }));
            Ok(())
        })
    }

    fn subscribe(&self, sink: PageEventSink) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            let mut console = self.page.event_listener::<EventConsoleApiCalled>().await?;
            let mut exceptions = self.page.event_listener::<EventExceptionThrown>().await?;
            let mut requests = self.page.event_listener::<EventRequestWillBeSent>().await?;
            let mut failures = self.page.event_listener::<EventLoadingFailed>().await?;
            let mut responses = self.page.event_listener::<EventResponseReceived>().await?;

            self.track(tokio::spawn(async move {
                let mut in_flight: HashMap<String, String> = HashMap::new();
                loop {
                    tokio::select! {
                        Some(event) = console.next() => {
                            let text = event
                                .args
                                .iter()
                                .map(|arg| match (&arg.value, &arg.description) {
                                    (Some(serde_json::Value::String(s)), _) => s.clone(),
                                    (Some(value), _) => value.to_string(),
                                    (None, Some(description)) => description.clone(),
                                    (None, None) => String::new(),
                                })
                                .collect::<Vec<_>>()
                                .join(" ");
                            sink(PageEvent::Console {
                                level: format!("{:?}", event.r#type).to_uppercase(),
                                text,
                            });
                        }
                        Some(event) = exceptions.next() => {
                            let details = &event.exception_details;
                            let message = details
                                .exception
                                .as_ref()
                                .and_then(|e| e.description.clone())
                                .unwrap_or_else(|| details.text.clone());
                            sink(PageEvent::PageError { message });
                        }
                        Some(event) = requests.next() => {
                            in_flight.insert(
                                event.request_id.inner().clone(),
                                event.request.url.clone(),
                            );
                        }
                        Some(event) = failures.next() => {
                            let url = in_flight
                                .remove(event.request_id.inner())
                                .unwrap_or_default();
                            sink(PageEvent::RequestFailed {
                                url,
                                error: event.error_text.clone(),
                            });
                        }
                        Some(event) = responses.next() => {
                            in_flight.remove(event.request_id.inner());
                            sink(PageEvent::Response {
                                status: event.response.status,
                                url: event.response.url.clone(),
                            });
                        }
                        else => break,
                    }
                }
            }));
            Ok(())
        })
    }

    fn detach_listeners(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            let handles: Vec<_> = self.listeners.lock().drain(..).collect();
            for handle in handles {
                handle.abort();
            }
            if self.intercepting.swap(false, Ordering::SeqCst) {
                self.page.execute(fetch::DisableParams::default()).await?;
            }
            Ok(())
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            self.network_task.abort();
            let handles: Vec<_> = self.listeners.lock().drain(..).collect();
            for handle in handles {
                handle.abort();
            }
            self.page.clone().close().await.context("Failed to close tab")?;
            Ok(())
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::RESOLVER_WAIT_TIMEOUT;

    #[test]
    fn test_command_deadline_comes_from_config() {
        let config = GenerationConfig::builder()
            .cms_url("https://shop.test/")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("valid config");

        let options = LaunchOptions::from_config(&config);
        assert_eq!(options.command_timeout, config.cdp_command_timeout());
        assert!(options.command_timeout > RESOLVER_WAIT_TIMEOUT);
    }

    #[test]
    fn test_default_command_deadline_outlasts_collectors() {
        assert!(LaunchOptions::default().command_timeout > DEFAULT_COLLECTOR_TIMEOUT);
    }
}
