//! URL and path helpers.

use anyhow::Result;
use std::path::{Path, PathBuf};
use url::Url;

/// Check if a URL is a navigable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Scheme + host (+ port) of a page URL, with a trailing slash.
///
/// Used to derive storefront-relative pages such as the cart.
pub fn base_url_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| anyhow::anyhow!("Failed to parse URL {url}: {e}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid URL: no host in {url}"))?;

    let mut base = format!("{}://{host}", parsed.scheme());
    if let Some(port) = parsed.port() {
        base.push_str(&format!(":{port}"));
    }
    base.push('/');
    Ok(base)
}

/// Screenshot file for a bundle page: `<dir>/bundleplan-<bundle>[-<suffix>].png`
#[must_use]
pub fn screenshot_path(dir: &Path, bundle: &str, suffix: Option<&str>) -> PathBuf {
    let file = match suffix {
        Some(suffix) => format!("bundleplan-{bundle}-{suffix}.png"),
        None => format!("bundleplan-{bundle}.png"),
    };
    dir.join(file)
}
