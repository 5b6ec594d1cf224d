//! Core configuration types for plan generation
//!
//! This module contains the main `GenerationConfig` struct and the small
//! value types it is built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::builder::GenerationConfigBuilder;
use crate::engine::RequestBlockPolicy;

/// HTTP basic credentials for storefronts behind an auth wall
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials only when both halves are given and non-empty
    #[must_use]
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Storefront page types, one bundle each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cms,
    Category,
    Product,
    Search,
    Checkout,
}

impl PageType {
    /// Collection order used by the default registry
    pub const ALL: [PageType; 5] = [
        PageType::Cms,
        PageType::Category,
        PageType::Product,
        PageType::Search,
        PageType::Checkout,
    ];

    /// Bundle name produced for this page type
    #[must_use]
    pub fn bundle_name(&self) -> &'static str {
        match self {
            Self::Cms => "cms",
            Self::Category => "category",
            Self::Product => "product",
            Self::Search => "search",
            Self::Checkout => "checkout",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bundle_name())
    }
}

/// One page a collector visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    /// Distinguishes several pages of one bundle (screenshot suffix, plan url key)
    pub label: Option<String>,
    pub url: String,
}

/// Main configuration struct for a generation run
///
/// Deserializing goes through [`GenerationConfigBuilder`], so a loaded config
/// is validated and its block policy compiled like a built one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GenerationConfigBuilder")]
pub struct GenerationConfig {
    pub(crate) cms_url: Option<String>,
    pub(crate) category_url: Option<String>,
    pub(crate) product_url: Option<String>,
    pub(crate) search_url: Option<String>,

    /// Explicit checkout flow pages; derived from the product URL's origin when empty
    pub(crate) checkout_urls: Vec<String>,

    #[serde(skip)]
    pub(crate) credentials: Option<Credentials>,

    /// Bounds each navigation and each collector; the run gets five times this
    pub(crate) timeout: Option<Duration>,

    pub(crate) excluded_modules: Vec<String>,
    pub(crate) include_mixins: bool,
    pub(crate) debug: bool,
    pub(crate) headless: bool,
    pub(crate) screenshot: bool,
    pub(crate) screenshot_dir: PathBuf,
    pub(crate) max_tabs: usize,
    pub(crate) memory_limit_mib: u64,
    pub(crate) skip_checkout: bool,
    pub(crate) skipped_collectors: Vec<String>,
    pub(crate) blocked_resources: Vec<String>,

    /// Compiled from the built-in patterns plus `blocked_resources`
    #[serde(skip)]
    pub(crate) block_policy: Arc<RequestBlockPolicy>,

    pub(crate) settle_delay: Duration,
    pub(crate) output_path: PathBuf,
    pub(crate) chrome_executable: Option<PathBuf>,
}
