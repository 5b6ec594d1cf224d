//! Collectors: one per storefront page type
//!
//! A collector leases a tab, visits its page(s), discovers the modules the page
//! loaded and returns them as a [`BundleConfig`]. Collectors run one at a time
//! and are looked up through an ordered [`CollectorRegistry`].

pub mod checkout;
pub mod diagnostics;
pub mod discovery;
pub mod js_scripts;
pub mod page;

use std::sync::Arc;

use futures::future::BoxFuture;
use log::debug;

use crate::config::{GenerationConfig, PageType};
use crate::engine::BrowsingSession;
use crate::generation::GenerateResult;
use crate::plan::BundleConfig;
use crate::tab_pool::TabPool;

pub use checkout::CheckoutCollector;
pub use diagnostics::PageLog;
pub use discovery::{DiscoveryOptions, discover_modules};
pub use page::PageCollector;

/// Everything a collector may use during one invocation
#[derive(Clone, Copy)]
pub struct CollectorContext<'a> {
    pub session: &'a dyn BrowsingSession,
    pub config: &'a GenerationConfig,
    pub pool: &'a TabPool,
}

pub type CollectorFuture<'a> = BoxFuture<'a, GenerateResult<BundleConfig>>;

/// Produces the bundle for one page type
///
/// A collector with nothing configured returns an empty bundle without
/// touching the pool. Any tab it leases is released on every path it
/// controls.
pub trait Collector: Send + Sync {
    /// Name of the bundle this collector produces
    fn name(&self) -> &str;

    fn collect<'a>(&'a self, ctx: CollectorContext<'a>) -> CollectorFuture<'a>;
}

/// Collectors in the order they run
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// cms, category, product, search, checkout
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for page_type in PageType::ALL {
            match page_type {
                PageType::Checkout => registry.register(CheckoutCollector::new()),
                other => registry.register(PageCollector::new(other)),
            }
        }
        registry
    }

    /// The standard registry minus whatever the config switches off
    #[must_use]
    pub fn for_config(config: &GenerationConfig) -> Self {
        let mut registry = Self::standard();
        registry
            .collectors
            .retain(|c| !config.is_collector_skipped(c.name()));
        debug!("Registered collectors: {:?}", registry.names());
        registry
    }

    /// Append a collector; one with the same name is replaced in place
    pub fn register(&mut self, collector: impl Collector + 'static) {
        let collector: Arc<dyn Collector> = Arc::new(collector);
        match self
            .collectors
            .iter_mut()
            .find(|c| c.name() == collector.name())
        {
            Some(slot) => *slot = collector,
            None => self.collectors.push(collector),
        }
    }

    /// Returns whether a collector was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.collectors.len();
        self.collectors.retain(|c| c.name() != name);
        self.collectors.len() != before
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Collector>> {
        self.collectors.iter()
    }
}
