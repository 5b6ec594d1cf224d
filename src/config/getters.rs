//! Getter methods for `GenerationConfig`
//!
//! Besides plain accessors this derives the effective timeouts and the
//! pages each collector visits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::types::{Credentials, GenerationConfig, PageTarget, PageType};
use crate::collector::DiscoveryOptions;
use crate::engine::RequestBlockPolicy;
use crate::utils::constants::{
    CDP_COMMAND_SLACK, DEFAULT_COLLECTOR_TIMEOUT, DEFAULT_EXCLUDED_MODULES,
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_RUN_TIMEOUT, LOADER_WAIT_TIMEOUT, RESOLVER_WAIT_TIMEOUT,
    RUN_TIMEOUT_MULTIPLIER,
};

impl GenerationConfig {
    #[must_use]
    pub fn cms_url(&self) -> Option<&str> {
        self.cms_url.as_deref()
    }

    #[must_use]
    pub fn category_url(&self) -> Option<&str> {
        self.category_url.as_deref()
    }

    #[must_use]
    pub fn product_url(&self) -> Option<&str> {
        self.product_url.as_deref()
    }

    #[must_use]
    pub fn search_url(&self) -> Option<&str> {
        self.search_url.as_deref()
    }

    #[must_use]
    pub fn checkout_urls(&self) -> &[String] {
        &self.checkout_urls
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The configured timeout, if any
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_NAVIGATION_TIMEOUT)
    }

    #[must_use]
    pub fn collector_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_COLLECTOR_TIMEOUT)
    }

    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        self.timeout
            .map_or(DEFAULT_RUN_TIMEOUT, |t| t * RUN_TIMEOUT_MULTIPLIER)
    }

    /// Deadline for a single CDP command
    ///
    /// Navigations and the loader waits run as single commands, so this must
    /// outlast the longest of them plus the collector deadline that wraps them.
    #[must_use]
    pub fn cdp_command_timeout(&self) -> Duration {
        self.collector_timeout()
            .max(self.navigation_timeout())
            .max(RESOLVER_WAIT_TIMEOUT)
            .max(LOADER_WAIT_TIMEOUT)
            + CDP_COMMAND_SLACK
    }

    /// User exclusions only; see [`Self::discovery_options`] for the effective list
    #[must_use]
    pub fn excluded_modules(&self) -> &[String] {
        &self.excluded_modules
    }

    #[must_use]
    pub fn include_mixins(&self) -> bool {
        self.include_mixins
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn screenshot(&self) -> bool {
        self.screenshot
    }

    #[must_use]
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    #[must_use]
    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    #[must_use]
    pub fn memory_limit_mib(&self) -> u64 {
        self.memory_limit_mib
    }

    #[must_use]
    pub fn skip_checkout(&self) -> bool {
        self.skip_checkout
    }

    #[must_use]
    pub fn skipped_collectors(&self) -> &[String] {
        &self.skipped_collectors
    }

    /// Whether the named collector is switched off
    #[must_use]
    pub fn is_collector_skipped(&self, name: &str) -> bool {
        (self.skip_checkout && name == PageType::Checkout.bundle_name())
            || self.skipped_collectors.iter().any(|s| s == name)
    }

    #[must_use]
    pub fn block_policy(&self) -> Arc<RequestBlockPolicy> {
        Arc::clone(&self.block_policy)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn chrome_executable(&self) -> Option<&PathBuf> {
        self.chrome_executable.as_ref()
    }

    #[must_use]
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            excluded_modules: DEFAULT_EXCLUDED_MODULES
                .iter()
                .map(|m| (*m).to_string())
                .chain(self.excluded_modules.iter().cloned())
                .collect(),
            include_mixins: self.include_mixins,
            settle_delay: self.settle_delay,
            ..DiscoveryOptions::default()
        }
    }

    /// Pages visited for a page type; empty when the type is not configured
    ///
    /// Only explicitly configured checkout pages are returned here. Without
    /// them the checkout collector derives its pages from the product page.
    #[must_use]
    pub fn targets_for(&self, page_type: PageType) -> Vec<PageTarget> {
        let single = |url: &Option<String>| {
            url.iter()
                .map(|u| PageTarget {
                    label: None,
                    url: u.clone(),
                })
                .collect()
        };

        match page_type {
            PageType::Cms => single(&self.cms_url),
            PageType::Category => single(&self.category_url),
            PageType::Product => single(&self.product_url),
            PageType::Search => single(&self.search_url),
            PageType::Checkout => self
                .checkout_urls
                .iter()
                .enumerate()
                .map(|(i, url)| PageTarget {
                    label: Some(format!("step{}", i + 1)),
                    url: url.clone(),
                })
                .collect(),
        }
    }
}
