//! Tests for the generation configuration builder

use std::path::Path;
use std::time::Duration;

use kodegen_tools_bundleplan::{Credentials, GenerateError, GenerationConfig, PageTarget, PageType};

#[test]
fn test_defaults() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .build()
        .expect("valid config");

    assert_eq!(config.max_tabs(), 3);
    assert_eq!(config.memory_limit_mib(), 6144);
    assert_eq!(config.timeout(), None);
    assert_eq!(config.collector_timeout(), Duration::from_millis(300_000));
    assert_eq!(config.run_timeout(), Duration::from_millis(1_800_000));
    assert_eq!(config.navigation_timeout(), Duration::from_secs(120));
    assert!(config.headless());
    assert!(config.include_mixins());
    assert!(!config.screenshot());
    assert_eq!(config.screenshot_dir(), Path::new("screenshots"));
    assert_eq!(config.output_path(), Path::new("bundleplan.config.json"));
    assert_eq!(config.settle_delay(), Duration::from_secs(5));
}

#[test]
fn test_configured_timeout_drives_all_deadlines() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .timeout(Duration::from_millis(60_000))
        .build()
        .expect("valid config");

    assert_eq!(config.collector_timeout(), Duration::from_millis(60_000));
    assert_eq!(config.navigation_timeout(), Duration::from_millis(60_000));
    assert_eq!(config.run_timeout(), Duration::from_millis(300_000));
}

#[test]
fn test_requires_at_least_one_url() {
    let err = GenerationConfig::builder().build().expect_err("no URLs");
    assert!(matches!(err, GenerateError::Config(_)));
}

#[test]
fn test_rejects_invalid_urls() {
    let err = GenerationConfig::builder()
        .product_url("shop.test/p.html")
        .build()
        .expect_err("missing scheme");
    assert!(err.to_string().contains("product URL"));

    let err = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .checkout_url("ftp://shop.test/checkout")
        .build()
        .expect_err("bad checkout URL");
    assert!(err.to_string().contains("checkout URL"));
}

#[test]
fn test_rejects_zero_limits() {
    let base = || GenerationConfig::builder().cms_url("https://shop.test/");
    assert!(base().timeout(Duration::ZERO).build().is_err());
    assert!(base().max_tabs(0).build().is_err());
    assert!(base().memory_limit_mib(0).build().is_err());
}

#[test]
fn test_block_patterns_treat_regex_syntax_literally() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .block_resource("*(unbalanced*")
        .build()
        .expect("glob metacharacters are literal");
    assert!(config.block_policy().is_blocked("https://x.test/(unbalanced.js"));
}

#[test]
fn test_excluded_modules_csv() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .excluded_modules_csv(" Vendor_A/js/a,, Vendor_B/js/b ,")
        .exclude_module("Vendor_C/js/c")
        .build()
        .expect("valid config");

    assert_eq!(
        config.excluded_modules(),
        ["Vendor_A/js/a", "Vendor_B/js/b", "Vendor_C/js/c"]
    );
    let options = config.discovery_options();
    assert_eq!(options.excluded_modules[0], "rjsResolver");
    assert_eq!(options.excluded_modules.len(), 4);
}

#[test]
fn test_skipped_collectors() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .skip_checkout(true)
        .skip_collector("search")
        .build()
        .expect("valid config");

    assert!(config.is_collector_skipped("checkout"));
    assert!(config.is_collector_skipped("search"));
    assert!(!config.is_collector_skipped("cms"));
}

#[test]
fn test_targets_per_page_type() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/about")
        .checkout_url("https://shop.test/checkout/cart")
        .checkout_url("https://shop.test/checkout")
        .build()
        .expect("valid config");

    assert_eq!(
        config.targets_for(PageType::Cms),
        vec![PageTarget {
            label: None,
            url: "https://shop.test/about".to_string()
        }]
    );
    assert!(config.targets_for(PageType::Product).is_empty());

    let checkout = config.targets_for(PageType::Checkout);
    assert_eq!(checkout.len(), 2);
    assert_eq!(checkout[0].label.as_deref(), Some("step1"));
    assert_eq!(checkout[1].url, "https://shop.test/checkout");
}

#[test]
fn test_credentials_are_not_printed() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .credentials("shop", "hunter2")
        .build()
        .expect("valid config");

    let debug = format!("{:?}", config.credentials());
    assert!(debug.contains("shop"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn test_cdp_command_deadline_outlasts_every_in_page_wait() {
    // Defaults: the 300s collector deadline is the longest bound
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .build()
        .expect("valid config");
    assert!(config.cdp_command_timeout() > config.collector_timeout());
    assert!(config.cdp_command_timeout() > config.navigation_timeout());

    // A short timeout must not cap the 120s resolver wait
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .timeout(Duration::from_secs(10))
        .build()
        .expect("valid config");
    assert!(config.cdp_command_timeout() > Duration::from_secs(120));

    // A long timeout raises the command deadline with it
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .timeout(Duration::from_secs(600))
        .build()
        .expect("valid config");
    assert!(config.cdp_command_timeout() > Duration::from_secs(600));
}

#[test]
fn test_deserialized_config_keeps_block_policy() {
    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .block_resource("*/tracking.js")
        .timeout(Duration::from_secs(60))
        .build()
        .expect("valid config");

    let json = serde_json::to_string(&config).expect("serializes");
    let loaded: GenerationConfig = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(loaded.cms_url(), Some("https://shop.test/"));
    assert_eq!(loaded.timeout(), Some(Duration::from_secs(60)));
    let policy = loaded.block_policy();
    assert!(policy.is_blocked("https://www.googletagmanager.com/gtm.js"));
    assert!(policy.is_blocked("https://shop.test/js/tracking.js"));
}

#[test]
fn test_deserialized_config_is_validated() {
    let err = serde_json::from_str::<GenerationConfig>(r#"{"cms_url": "not a url"}"#)
        .expect_err("invalid URL rejected");
    assert!(err.to_string().contains("Invalid cms URL"));

    let loaded: GenerationConfig =
        serde_json::from_str(r#"{"product_url": "https://shop.test/bag.html"}"#)
            .expect("missing fields take builder defaults");
    assert_eq!(loaded.max_tabs(), 3);
    assert!(loaded.headless());
}

#[test]
fn test_credentials_need_both_halves() {
    let some = |s: &str| Some(s.to_string());

    assert_eq!(Credentials::from_parts(some("shop"), None), None);
    assert_eq!(Credentials::from_parts(None, some("hunter2")), None);
    assert_eq!(Credentials::from_parts(some("shop"), some("")), None);
    assert_eq!(
        Credentials::from_parts(some("shop"), some("hunter2")),
        Some(Credentials::new("shop", "hunter2"))
    );

    let config = GenerationConfig::builder()
        .cms_url("https://shop.test/")
        .maybe_credentials(Credentials::from_parts(some("shop"), None))
        .build()
        .expect("valid config");
    assert!(config.credentials().is_none());
}
