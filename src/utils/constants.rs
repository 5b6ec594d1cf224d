//! Shared configuration constants for bundle plan generation
//!
//! Default values used throughout the codebase to ensure consistency and
//! avoid magic numbers.

use std::time::Duration;

/// Maximum number of tabs the pool keeps alive at once
pub const DEFAULT_MAX_TABS: usize = 3;

/// Per-collector timeout: 5 minutes
pub const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Whole-run timeout when no per-collector timeout is configured: 30 minutes
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_millis(1_800_000);

/// When a per-collector timeout is configured, the run is bounded by this
/// multiple of it.
pub const RUN_TIMEOUT_MULTIPLIER: u32 = 5;

/// Resident memory ceiling in MiB (6 GiB)
pub const DEFAULT_MEMORY_LIMIT_MIB: u64 = 6144;

/// Navigation timeout used when the config does not set one
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Bound on the `about:blank` navigation performed while cleaning a tab
pub const TAB_CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long discovery waits for the module loader global to appear
pub const LOADER_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long discovery waits for the loader's "all modules resolved" signal
pub const RESOLVER_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fallback bound on the idle-frame callback
pub const IDLE_CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra settle delay after the page went idle
pub const DISCOVERY_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Quiet period used by network-idle detection
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Browser launch timeout
pub const BROWSER_LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Headroom added on top of the longest in-page wait when sizing the CDP
/// command deadline, so our own timeouts always fire first
pub const CDP_COMMAND_SLACK: Duration = Duration::from_secs(30);

/// Mobile viewport used for every tab
pub const VIEWPORT_WIDTH: u32 = 412;
pub const VIEWPORT_HEIGHT: u32 = 732;

/// Name of the generated plan file, written to the working directory
pub const PLAN_FILE_NAME: &str = "bundleplan.config.json";

/// Name of the bundle holding modules shared by two or more bundles
pub const COMMON_BUNDLE_NAME: &str = "common";

/// Screenshot directory used when screenshots are enabled without a path
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Diagnostic log entries containing this fragment are not dumped
/// (product image responses drown everything else).
pub const PAGE_LOG_NOISE_FRAGMENT: &str = "media/catalog/product";

/// Resources blocked on every collector page.
///
/// Loader configs generated from a previous plan (served from `magepack/`)
/// keep the resolver signal from ever firing; the trackers keep the network
/// from going idle.
pub const DEFAULT_BLOCKED_RESOURCES: &[&str] = &[
    "*/magepack/requirejs-config-*.js",
    "*googletagmanager.com*",
    "*app.termly.io*",
];

/// Modules never written into a plan
pub const DEFAULT_EXCLUDED_MODULES: &[&str] = &["rjsResolver"];
