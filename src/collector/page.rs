//! Collector for single-page bundles (cms, category, product, search)
//!
//! Also hosts the tab preparation and lease bookkeeping the checkout
//! collector shares.

use anyhow::{Context, Result};
use log::{debug, info};

use super::{Collector, CollectorContext, CollectorFuture, PageLog, discover_modules};
use crate::config::{GenerationConfig, PageTarget, PageType};
use crate::engine::{NavigateOptions, WaitCondition};
use crate::generation::{GenerateError, GenerateResult};
use crate::plan::{BundleConfig, BundleUrl, ModuleMap};
use crate::tab_pool::{Tab, TabPool};
use crate::utils::screenshot_path;

pub struct PageCollector {
    page_type: PageType,
}

impl PageCollector {
    #[must_use]
    pub fn new(page_type: PageType) -> Self {
        Self { page_type }
    }

    async fn visit_all(
        &self,
        tab: &Tab,
        targets: &[PageTarget],
        config: &GenerationConfig,
        log: &PageLog,
    ) -> Result<ModuleMap> {
        prepare_tab(tab, config, log).await?;

        let options = config.discovery_options();
        let mut modules = ModuleMap::new();
        for target in targets {
            visit(tab, &target.url, config).await?;
            capture(tab, config, self.name(), target.label.as_deref()).await?;
            modules.extend(discover_modules(&**tab, &options).await?);
        }
        Ok(modules)
    }
}

impl Collector for PageCollector {
    fn name(&self) -> &str {
        self.page_type.bundle_name()
    }

    fn collect<'a>(&'a self, ctx: CollectorContext<'a>) -> CollectorFuture<'a> {
        Box::pin(async move {
            let name = self.name();
            info!("Collecting modules for bundle \"{name}\".");

            let targets = ctx.config.targets_for(self.page_type);
            let mut bundle = BundleConfig::new(name, bundle_url(&targets));
            if targets.is_empty() {
                info!("No URL configured for bundle \"{name}\" - skipping.");
                return Ok(bundle);
            }

            let tab = ctx.pool.lease().await?;
            debug!("Using pooled tab {} for {name}", tab.id());

            let log = PageLog::new();
            let outcome = self.visit_all(&tab, &targets, ctx.config, &log).await;
            bundle.merge_modules(finish(ctx.pool, &tab, &log, name, outcome).await?);

            info!(
                "Finished collecting modules for bundle \"{name}\" ({} modules).",
                bundle.modules.len()
            );
            Ok(bundle)
        })
    }
}

fn bundle_url(targets: &[PageTarget]) -> BundleUrl {
    match targets {
        [] => BundleUrl::default(),
        [single] if single.label.is_none() => BundleUrl::Single(single.url.clone()),
        many => BundleUrl::List(many.iter().map(|t| t.url.clone()).collect()),
    }
}

/// Subscribe diagnostics, install request blocking and credentials, and set
/// the navigation timeout
pub(crate) async fn prepare_tab(tab: &Tab, config: &GenerationConfig, log: &PageLog) -> Result<()> {
    tab.subscribe(log.sink()).await?;
    tab.block_requests(config.block_policy()).await?;
    tab.set_default_navigation_timeout(Some(config.navigation_timeout()));
    if let Some(credentials) = config.credentials() {
        tab.authenticate(credentials).await?;
    }
    Ok(())
}

/// Navigate and wait for the network to go idle
pub(crate) async fn visit(tab: &Tab, url: &str, config: &GenerationConfig) -> Result<()> {
    debug!("Navigating tab {} to {url}", tab.id());
    tab.navigate(
        url,
        NavigateOptions::new(WaitCondition::NetworkIdle).with_timeout(config.navigation_timeout()),
    )
    .await
    .with_context(|| format!("Navigation to {url} failed"))
}

/// Full-page screenshot when enabled
pub(crate) async fn capture(
    tab: &Tab,
    config: &GenerationConfig,
    bundle: &str,
    suffix: Option<&str>,
) -> Result<()> {
    if !config.screenshot() {
        return Ok(());
    }
    let path = screenshot_path(config.screenshot_dir(), bundle, suffix);
    tab.screenshot(&path)
        .await
        .with_context(|| format!("Screenshot {} failed", path.display()))
}

/// Release the tab on both paths; on failure dump the page log first
pub(crate) async fn finish(
    pool: &TabPool,
    tab: &Tab,
    log: &PageLog,
    bundle: &str,
    outcome: Result<ModuleMap>,
) -> GenerateResult<ModuleMap> {
    match outcome {
        Ok(modules) => {
            pool.release(tab).await;
            debug!("Released tab {} back to pool", tab.id());
            Ok(modules)
        }
        Err(e) => {
            log.dump(bundle);
            pool.release(tab).await;
            debug!("Released tab {} back to pool after error", tab.id());
            Err(GenerateError::collector(bundle, e))
        }
    }
}
