//! Collector for the cart and checkout pages
//!
//! With explicit checkout pages configured they are visited in order.
//! Otherwise a product is put in the cart first (the checkout redirects away
//! from an empty cart) and the cart and checkout pages under the storefront's
//! base URL are visited.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;

use super::js_scripts::{ADD_TO_CART_SCRIPT, BASE_URL_SCRIPT};
use super::page::{capture, finish, prepare_tab, visit};
use super::{Collector, CollectorContext, CollectorFuture, PageLog, discover_modules};
use crate::config::{GenerationConfig, PageTarget, PageType};
use crate::plan::{BundleConfig, BundleUrl, ModuleMap};
use crate::tab_pool::Tab;
use crate::utils::base_url_of;

#[derive(Debug, Deserialize)]
struct AddToCartOutcome {
    submitted: bool,
    status: Option<i64>,
}

#[derive(Debug, Default)]
pub struct CheckoutCollector;

impl CheckoutCollector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fill the cart from the product page, then derive cart and checkout URLs
    async fn prepare_cart(
        &self,
        tab: &Tab,
        product_url: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<PageTarget>> {
        visit(tab, product_url, config).await?;
        capture(tab, config, self.name(), Some("product")).await?;

        let outcome: AddToCartOutcome = serde_json::from_value(
            tab.evaluate(ADD_TO_CART_SCRIPT)
                .await
                .context("Adding the product to the cart failed")?,
        )
        .context("Unexpected add-to-cart result")?;
        match outcome {
            AddToCartOutcome {
                submitted: true,
                status,
            } => debug!("Add-to-cart form posted (status {status:?})"),
            AddToCartOutcome { .. } => {
                warn!("No add-to-cart form on {product_url}; the checkout may redirect to an empty cart");
            }
        }

        let base = match tab.evaluate(BASE_URL_SCRIPT).await? {
            serde_json::Value::String(base) if !base.is_empty() => base,
            _ => base_url_of(product_url)?,
        };
        let base = if base.ends_with('/') { base } else { format!("{base}/") };

        Ok(vec![
            PageTarget {
                label: Some("cart".to_string()),
                url: format!("{base}checkout/cart"),
            },
            PageTarget {
                label: None,
                url: format!("{base}checkout"),
            },
        ])
    }

    async fn visit_all(
        &self,
        tab: &Tab,
        explicit: &[PageTarget],
        config: &GenerationConfig,
        log: &PageLog,
        visited: &mut BTreeMap<String, String>,
    ) -> Result<ModuleMap> {
        prepare_tab(tab, config, log).await?;

        let targets = match (explicit, config.product_url()) {
            ([], Some(product)) => self.prepare_cart(tab, product, config).await?,
            _ => explicit.to_vec(),
        };

        let options = config.discovery_options();
        let mut modules = ModuleMap::new();
        for target in &targets {
            visit(tab, &target.url, config).await?;
            capture(tab, config, self.name(), target.label.as_deref()).await?;
            modules.extend(discover_modules(&**tab, &options).await?);
            visited.insert(
                target.label.clone().unwrap_or_else(|| self.name().to_string()),
                target.url.clone(),
            );
        }
        Ok(modules)
    }
}

impl Collector for CheckoutCollector {
    fn name(&self) -> &str {
        PageType::Checkout.bundle_name()
    }

    fn collect<'a>(&'a self, ctx: CollectorContext<'a>) -> CollectorFuture<'a> {
        Box::pin(async move {
            let name = self.name();
            info!("Collecting modules for bundle \"{name}\".");

            let explicit = ctx.config.targets_for(PageType::Checkout);
            if explicit.is_empty() && ctx.config.product_url().is_none() {
                info!("No URL configured for bundle \"{name}\" - skipping.");
                return Ok(BundleConfig::new(name, BundleUrl::Map(BTreeMap::new())));
            }

            let tab = ctx.pool.lease().await?;
            debug!("Using pooled tab {} for {name}", tab.id());

            let log = PageLog::new();
            let mut visited = BTreeMap::new();
            let outcome = self
                .visit_all(&tab, &explicit, ctx.config, &log, &mut visited)
                .await;
            let modules = finish(ctx.pool, &tab, &log, name, outcome).await?;

            let mut bundle = BundleConfig::new(name, BundleUrl::Map(visited));
            bundle.merge_modules(modules);
            info!(
                "Finished collecting modules for bundle \"{name}\" ({} modules).",
                bundle.modules.len()
            );
            Ok(bundle)
        })
    }
}
