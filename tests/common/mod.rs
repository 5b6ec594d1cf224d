//! Test utilities: an in-memory automation engine and canned collectors

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;

use kodegen_tools_bundleplan::{
    AutomationEngine, BrowsingSession, BundleConfig, BundleUrl, Collector, CollectorContext,
    Credentials, GenerateError, GenerationConfig, MemoryProbe, MemoryStats, ModuleMap,
    NavigateOptions, PageEvent, PageEventSink, PageHandle, ProgressReporter, RequestBlockPolicy,
    RunPhase, engine::EngineFuture, collector::CollectorFuture,
};

// =============================================================================
// Mock engine
// =============================================================================

/// Shared behaviour and counters for every session and tab of a mock engine
#[derive(Default)]
pub struct MockWorld {
    pub modules_by_url: Mutex<HashMap<String, ModuleMap>>,
    pub hang_urls: Mutex<HashSet<String>>,
    pub fail_urls: Mutex<HashSet<String>>,
    /// Navigating to about:blank fails, so tab cleaning fails
    pub fail_cleanup: AtomicBool,
    pub fail_new_tab: AtomicBool,
    /// Closing the session and the engine fails (after counting the attempt)
    pub fail_teardown: AtomicBool,
    pub base_url: Mutex<Option<String>>,
    pub cart_form_present: AtomicBool,

    pub tabs_opened: AtomicUsize,
    pub tabs_closed: AtomicUsize,
    pub sessions_created: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub engine_closed: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub credentials_seen: Mutex<Vec<Credentials>>,
    pub block_policies: Mutex<Vec<Arc<RequestBlockPolicy>>>,
    pub screenshots: Mutex<Vec<PathBuf>>,
    pub scripts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockWorld {
    pub fn new() -> Arc<Self> {
        let world = Self::default();
        world.cart_form_present.store(true, Ordering::SeqCst);
        Arc::new(world)
    }

    pub fn serve(&self, url: &str, modules: &[(&str, &str)]) {
        self.modules_by_url.lock().insert(
            url.to_string(),
            modules
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
    }

    pub fn hang_on(&self, url: &str) {
        self.hang_urls.lock().insert(url.to_string());
    }

    pub fn fail_on(&self, url: &str) {
        self.fail_urls.lock().insert(url.to_string());
    }

    pub fn opened(&self) -> usize {
        self.tabs_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.tabs_closed.load(Ordering::SeqCst)
    }

    /// Navigations other than the blank page used for cleaning
    pub fn page_visits(&self) -> Vec<String> {
        self.navigations
            .lock()
            .iter()
            .filter(|url| url.as_str() != "about:blank")
            .cloned()
            .collect()
    }
}

pub struct MockEngine {
    pub world: Arc<MockWorld>,
}

#[allow(dead_code)]
impl MockEngine {
    pub fn new(world: Arc<MockWorld>) -> Arc<Self> {
        Arc::new(Self { world })
    }
}

impl AutomationEngine for MockEngine {
    fn new_isolated_session(&self) -> EngineFuture<'_, Arc<dyn BrowsingSession>> {
        Box::pin(async move {
            self.world.sessions_created.fetch_add(1, Ordering::SeqCst);
            let session: Arc<dyn BrowsingSession> = Arc::new(MockSession {
                world: Arc::clone(&self.world),
            });
            Ok(session)
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            self.world.engine_closed.fetch_add(1, Ordering::SeqCst);
            if self.world.fail_teardown.load(Ordering::SeqCst) {
                return Err(anyhow!("Browser.close: connection reset"));
            }
            Ok(())
        })
    }
}

pub struct MockSession {
    pub world: Arc<MockWorld>,
}

impl BrowsingSession for MockSession {
    fn new_tab(&self) -> EngineFuture<'_, Arc<dyn PageHandle>> {
        Box::pin(async move {
            if self.world.fail_new_tab.load(Ordering::SeqCst) {
                return Err(anyhow!("Target.createTarget failed"));
            }
            self.world.tabs_opened.fetch_add(1, Ordering::SeqCst);
            let page: Arc<dyn PageHandle> = Arc::new(MockPage::new(Arc::clone(&self.world)));
            Ok(page)
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            self.world.sessions_closed.fetch_add(1, Ordering::SeqCst);
            if self.world.fail_teardown.load(Ordering::SeqCst) {
                return Err(anyhow!("Target.disposeBrowserContext failed"));
            }
            Ok(())
        })
    }
}

pub struct MockPage {
    world: Arc<MockWorld>,
    current_url: Mutex<String>,
    nav_timeout: Mutex<Option<Duration>>,
    sinks: Mutex<Vec<PageEventSink>>,
    intercepting: AtomicBool,
    closed: AtomicBool,
}

#[allow(dead_code)]
impl MockPage {
    pub fn new(world: Arc<MockWorld>) -> Self {
        Self {
            world,
            current_url: Mutex::new("about:blank".to_string()),
            nav_timeout: Mutex::new(None),
            sinks: Mutex::new(Vec::new()),
            intercepting: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn is_intercepting(&self) -> bool {
        self.intercepting.load(Ordering::SeqCst)
    }

    fn emit(&self, event: PageEvent) {
        let sinks: Vec<_> = self.sinks.lock().clone();
        for sink in sinks {
            sink(event.clone());
        }
    }
}

impl PageHandle for MockPage {
    fn navigate<'a>(&'a self, url: &'a str, _options: NavigateOptions) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.world.navigations.lock().push(url.to_string());

            if url == "about:blank" && self.world.fail_cleanup.load(Ordering::SeqCst) {
                return Err(anyhow!("Navigation to about:blank timed out"));
            }
            if self.world.hang_urls.lock().contains(url) {
                futures::future::pending::<()>().await;
            }
            if self.world.fail_urls.lock().contains(url) {
                self.emit(PageEvent::RequestFailed {
                    url: url.to_string(),
                    error: "net::ERR_CONNECTION_REFUSED".to_string(),
                });
                return Err(anyhow!("net::ERR_CONNECTION_REFUSED at {url}"));
            }

            *self.current_url.lock() = url.to_string();
            self.emit(PageEvent::Response {
                status: 200,
                url: url.to_string(),
            });
            self.emit(PageEvent::Console {
                level: "LOG".to_string(),
                text: format!("loaded {url}"),
            });
            Ok(())
        })
    }

    fn evaluate<'a>(&'a self, script: &'a str) -> EngineFuture<'a, serde_json::Value> {
        Box::pin(async move {
            self.world.scripts.lock().push(script.to_string());

            if script.contains("collectDefinedModules") {
                let url = self.current_url.lock().clone();
                let modules = self
                    .world
                    .modules_by_url
                    .lock()
                    .get(&url)
                    .cloned()
                    .unwrap_or_default();
                return Ok(serde_json::to_value(modules)?);
            }
            if script.contains("product_addtocart_form") {
                let present = self.world.cart_form_present.load(Ordering::SeqCst);
                return Ok(serde_json::json!({
                    "submitted": present,
                    "status": if present { Some(200) } else { None },
                }));
            }
            if script.contains("BASE_URL") {
                return Ok(self
                    .world
                    .base_url
                    .lock()
                    .clone()
                    .map_or(serde_json::Value::Null, serde_json::Value::String));
            }
            Ok(serde_json::Value::Bool(true))
        })
    }

    fn screenshot<'a>(&'a self, path: &'a Path) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.world.screenshots.lock().push(path.to_path_buf());
            Ok(())
        })
    }

    fn set_default_navigation_timeout(&self, timeout: Option<Duration>) {
        *self.nav_timeout.lock() = timeout;
    }

    fn default_navigation_timeout(&self) -> Option<Duration> {
        *self.nav_timeout.lock()
    }

    fn authenticate<'a>(&'a self, credentials: &'a Credentials) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.world.credentials_seen.lock().push(credentials.clone());
            Ok(())
        })
    }

    fn block_requests(&self, policy: Arc<RequestBlockPolicy>) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            self.intercepting.store(true, Ordering::SeqCst);
            self.world.block_policies.lock().push(policy);
            Ok(())
        })
    }

    fn subscribe(&self, sink: PageEventSink) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            self.sinks.lock().push(sink);
            Ok(())
        })
    }

    fn detach_listeners(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            self.sinks.lock().clear();
            self.intercepting.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn close(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::SeqCst) {
                self.world.tabs_closed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Canned collectors, probes and reporters
// =============================================================================

/// Returns fixed modules without touching the browser
pub struct StaticCollector {
    pub name: String,
    pub modules: ModuleMap,
    pub hang: bool,
    pub fail: bool,
    /// Time spent before returning the bundle
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl StaticCollector {
    pub fn new(name: &str, modules: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            modules: modules
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            hang: false,
            fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn taking(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Collector for StaticCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect<'a>(&'a self, ctx: CollectorContext<'a>) -> CollectorFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                // Hold a tab so teardown has something to reclaim
                let _tab = ctx.pool.lease().await?;
                futures::future::pending::<()>().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(GenerateError::collector(
                    self.name.clone(),
                    anyhow!("page exploded"),
                ));
            }
            let mut bundle = BundleConfig::new(self.name.clone(), BundleUrl::default());
            bundle.merge_modules(self.modules.clone());
            Ok(bundle)
        })
    }
}

pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn sample(&self) -> MemoryStats {
        MemoryStats {
            rss: self.0,
            ..MemoryStats::default()
        }
    }
}

/// Records every phase it is told about
#[derive(Default, Clone)]
pub struct RecordingProgress {
    pub phases: Arc<Mutex<Vec<RunPhase>>>,
    pub completed: Arc<Mutex<Vec<String>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl ProgressReporter for RecordingProgress {
    fn report_phase(&self, phase: &RunPhase) {
        self.phases.lock().push(phase.clone());
    }

    fn report_collector_completed(&self, bundle: &BundleConfig, _memory: &MemoryStats) {
        self.completed.lock().push(bundle.name.clone());
    }

    fn report_error(&self, error: &str) {
        self.errors.lock().push(error.to_string());
    }
}

/// Config with no discovery settle delay so tests run fast
#[allow(dead_code)]
pub fn fast_config() -> kodegen_tools_bundleplan::GenerationConfigBuilder {
    GenerationConfig::builder().settle_delay(Duration::ZERO)
}

pub fn modules(pairs: &[(&str, &str)]) -> ModuleMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
