//! Module discovery on a loaded page
//!
//! Waits for the page's module loader to settle, then asks it for every module
//! it defined along with that module's unbundled path.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use super::js_scripts::{
    COLLECT_MODULES_SCRIPT, WAIT_FOR_IDLE_SCRIPT, WAIT_FOR_LOADER_SCRIPT,
    WAIT_FOR_RESOLVER_SCRIPT, json, render,
};
use crate::engine::PageHandle;
use crate::plan::ModuleMap;
use crate::utils::constants::{
    DEFAULT_EXCLUDED_MODULES, DISCOVERY_SETTLE_DELAY, IDLE_CALLBACK_TIMEOUT, LOADER_WAIT_TIMEOUT,
    RESOLVER_WAIT_TIMEOUT,
};

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Module names never reported
    pub excluded_modules: Vec<String>,
    /// Also report enabled mixins of every discovered module
    pub include_mixins: bool,
    pub loader_timeout: Duration,
    pub resolver_timeout: Duration,
    pub idle_timeout: Duration,
    /// Pause after the page went idle
    pub settle_delay: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            excluded_modules: DEFAULT_EXCLUDED_MODULES
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            include_mixins: true,
            loader_timeout: LOADER_WAIT_TIMEOUT,
            resolver_timeout: RESOLVER_WAIT_TIMEOUT,
            idle_timeout: IDLE_CALLBACK_TIMEOUT,
            settle_delay: DISCOVERY_SETTLE_DELAY,
        }
    }
}

fn timeout_ms(duration: Duration) -> serde_json::Value {
    json(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Collect every module the page's loader defined
///
/// Plugin-loaded modules other than `text!`, absolute URLs and excluded names
/// are skipped.
pub async fn discover_modules(page: &dyn PageHandle, options: &DiscoveryOptions) -> Result<ModuleMap> {
    page.evaluate(&render(
        WAIT_FOR_LOADER_SCRIPT,
        &[("TIMEOUT_MS", timeout_ms(options.loader_timeout))],
    ))
    .await
    .context("Module loader never became available")?;

    page.evaluate(&render(
        WAIT_FOR_RESOLVER_SCRIPT,
        &[("TIMEOUT_MS", timeout_ms(options.resolver_timeout))],
    ))
    .await
    .context("Module resolver did not finish")?;

    page.evaluate(&render(
        WAIT_FOR_IDLE_SCRIPT,
        &[("TIMEOUT_MS", timeout_ms(options.idle_timeout))],
    ))
    .await
    .context("Waiting for an idle frame failed")?;

    if !options.settle_delay.is_zero() {
        tokio::time::sleep(options.settle_delay).await;
    }

    let value = page
        .evaluate(&render(
            COLLECT_MODULES_SCRIPT,
            &[
                ("EXCLUDED", json(&options.excluded_modules)),
                ("INCLUDE_MIXINS", json(&options.include_mixins)),
            ],
        ))
        .await
        .context("Collecting defined modules failed")?;

    let modules: ModuleMap =
        serde_json::from_value(value).context("Module map returned by the page is malformed")?;
    debug!("Discovered {} modules", modules.len());
    Ok(modules)
}
