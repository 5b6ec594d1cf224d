//! Builder for `GenerationConfig`
//!
//! All page URLs are optional individually; `build()` requires at least one
//! and validates everything else.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::types::{Credentials, GenerationConfig};
use crate::engine::RequestBlockPolicy;
use crate::generation::GenerateError;
use crate::utils::constants::{
    DEFAULT_MAX_TABS, DEFAULT_MEMORY_LIMIT_MIB, DEFAULT_SCREENSHOT_DIR, DISCOVERY_SETTLE_DELAY,
    PLAN_FILE_NAME,
};
use crate::utils::is_valid_url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfigBuilder {
    cms_url: Option<String>,
    category_url: Option<String>,
    product_url: Option<String>,
    search_url: Option<String>,
    checkout_urls: Vec<String>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    excluded_modules: Vec<String>,
    include_mixins: bool,
    debug: bool,
    headless: bool,
    screenshot: bool,
    screenshot_dir: Option<PathBuf>,
    max_tabs: usize,
    memory_limit_mib: u64,
    skip_checkout: bool,
    skipped_collectors: Vec<String>,
    blocked_resources: Vec<String>,
    settle_delay: Duration,
    output_path: Option<PathBuf>,
    chrome_executable: Option<PathBuf>,
}

impl Default for GenerationConfigBuilder {
    fn default() -> Self {
        Self {
            cms_url: None,
            category_url: None,
            product_url: None,
            search_url: None,
            checkout_urls: Vec::new(),
            credentials: None,
            timeout: None,
            excluded_modules: Vec::new(),
            include_mixins: true,
            debug: false,
            headless: true,
            screenshot: false,
            screenshot_dir: None,
            max_tabs: DEFAULT_MAX_TABS,
            memory_limit_mib: DEFAULT_MEMORY_LIMIT_MIB,
            skip_checkout: false,
            skipped_collectors: Vec::new(),
            blocked_resources: Vec::new(),
            settle_delay: DISCOVERY_SETTLE_DELAY,
            output_path: None,
            chrome_executable: None,
        }
    }
}

impl TryFrom<GenerationConfigBuilder> for GenerationConfig {
    type Error = GenerateError;

    fn try_from(builder: GenerationConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl GenerationConfig {
    /// Create a builder for configuring a `GenerationConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::default()
    }
}

impl GenerationConfigBuilder {
    #[must_use]
    pub fn cms_url(mut self, url: impl Into<String>) -> Self {
        self.cms_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn category_url(mut self, url: impl Into<String>) -> Self {
        self.category_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn product_url(mut self, url: impl Into<String>) -> Self {
        self.product_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn checkout_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_urls.push(url.into());
        self
    }

    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set or clear credentials; see [`Credentials::from_parts`]
    #[must_use]
    pub fn maybe_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn exclude_module(mut self, name: impl Into<String>) -> Self {
        self.excluded_modules.push(name.into());
        self
    }

    /// Add modules from a comma separated list, ignoring blanks
    #[must_use]
    pub fn excluded_modules_csv(mut self, list: &str) -> Self {
        self.excluded_modules.extend(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        self
    }

    #[must_use]
    pub fn include_mixins(mut self, include: bool) -> Self {
        self.include_mixins = include;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn screenshot(mut self, enabled: bool) -> Self {
        self.screenshot = enabled;
        self
    }

    #[must_use]
    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn max_tabs(mut self, max_tabs: usize) -> Self {
        self.max_tabs = max_tabs;
        self
    }

    #[must_use]
    pub fn memory_limit_mib(mut self, limit: u64) -> Self {
        self.memory_limit_mib = limit;
        self
    }

    #[must_use]
    pub fn skip_checkout(mut self, skip: bool) -> Self {
        self.skip_checkout = skip;
        self
    }

    #[must_use]
    pub fn skip_collector(mut self, name: impl Into<String>) -> Self {
        self.skipped_collectors.push(name.into());
        self
    }

    #[must_use]
    pub fn block_resource(mut self, pattern: impl Into<String>) -> Self {
        self.blocked_resources.push(pattern.into());
        self
    }

    /// Pause between the page going idle and module collection
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn build(self) -> Result<GenerationConfig, GenerateError> {
        let urls = [
            ("cms", &self.cms_url),
            ("category", &self.category_url),
            ("product", &self.product_url),
            ("search", &self.search_url),
        ];
        for (kind, url) in urls {
            if let Some(url) = url
                && !is_valid_url(url)
            {
                return Err(GenerateError::Config(format!("Invalid {kind} URL: {url}")));
            }
        }
        if let Some(url) = self.checkout_urls.iter().find(|u| !is_valid_url(u)) {
            return Err(GenerateError::Config(format!("Invalid checkout URL: {url}")));
        }
        if urls.iter().all(|(_, url)| url.is_none()) && self.checkout_urls.is_empty() {
            return Err(GenerateError::Config(
                "At least one page URL must be configured".to_string(),
            ));
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(GenerateError::Config("Timeout must be greater than zero".to_string()));
        }
        if self.max_tabs == 0 {
            return Err(GenerateError::Config("Tab pool needs at least one tab".to_string()));
        }
        if self.memory_limit_mib == 0 {
            return Err(GenerateError::Config("Memory limit must be greater than zero".to_string()));
        }

        let block_policy = RequestBlockPolicy::with_defaults(&self.blocked_resources)
            .map_err(|e| GenerateError::Config(format!("{e:#}")))?;

        Ok(GenerationConfig {
            cms_url: self.cms_url,
            category_url: self.category_url,
            product_url: self.product_url,
            search_url: self.search_url,
            checkout_urls: self.checkout_urls,
            credentials: self.credentials,
            timeout: self.timeout,
            excluded_modules: self.excluded_modules,
            include_mixins: self.include_mixins,
            debug: self.debug,
            headless: self.headless,
            screenshot: self.screenshot,
            screenshot_dir: self
                .screenshot_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT_DIR)),
            max_tabs: self.max_tabs,
            memory_limit_mib: self.memory_limit_mib,
            skip_checkout: self.skip_checkout,
            skipped_collectors: self.skipped_collectors,
            blocked_resources: self.blocked_resources,
            block_policy: Arc::new(block_policy),
            settle_delay: self.settle_delay,
            output_path: self.output_path.unwrap_or_else(|| PathBuf::from(PLAN_FILE_NAME)),
            chrome_executable: self.chrome_executable,
        })
    }
}
