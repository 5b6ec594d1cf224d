// Bundle plan generator CLI
//
// Visits one page per storefront page type in a headless browser and writes
// the modules each page loads as a deduplicated bundling plan.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kodegen_tools_bundleplan::utils::constants::{
    DEFAULT_MAX_TABS, DEFAULT_MEMORY_LIMIT_MIB, DEFAULT_SCREENSHOT_DIR, PLAN_FILE_NAME,
};
use kodegen_tools_bundleplan::{Credentials, GenerationConfig, generate};

#[derive(Debug, Parser)]
#[command(name = "kodegen-bundleplan", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a bundling plan from live storefront pages
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// CMS page URL
    #[arg(short = 'c', long, env = "BUNDLEPLAN_CMS_URL")]
    cms_url: String,

    /// Category page URL
    #[arg(short = 'g', long, env = "BUNDLEPLAN_CATEGORY_URL")]
    category_url: String,

    /// Product page URL
    #[arg(short = 'p', long, env = "BUNDLEPLAN_PRODUCT_URL")]
    product_url: String,

    /// Search results page URL
    #[arg(long, env = "BUNDLEPLAN_SEARCH_URL")]
    search_url: Option<String>,

    /// Explicit checkout flow page (repeatable); derived from the product page when omitted
    #[arg(long = "checkout-url")]
    checkout_urls: Vec<String>,

    /// Basic auth username
    #[arg(short = 'u', long, env = "BUNDLEPLAN_AUTH_USERNAME")]
    auth_username: Option<String>,

    /// Basic auth password
    #[arg(short = 'w', long, env = "BUNDLEPLAN_AUTH_PASSWORD", hide_env_values = true)]
    auth_password: Option<String>,

    /// Debug logging and a visible browser window
    #[arg(short = 'd', long)]
    debug: bool,

    /// Save a full-page screenshot of every visited page
    #[arg(short = 's', long)]
    screenshot: bool,

    /// Screenshot directory
    #[arg(long, default_value = DEFAULT_SCREENSHOT_DIR)]
    screenshot_path: PathBuf,

    /// Comma separated module names to leave out of the plan
    #[arg(short = 'e', long)]
    excluded_modules: Option<String>,

    /// Navigation and per-collector timeout in milliseconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Do not collect the checkout bundle
    #[arg(long)]
    skip_checkout: bool,

    /// Skip a collector by name (repeatable)
    #[arg(long = "skip")]
    skip: Vec<String>,

    /// Leave mixins of discovered modules out of the plan
    #[arg(long)]
    no_mixins: bool,

    /// Extra request URL glob to block (repeatable)
    #[arg(long = "block")]
    block: Vec<String>,

    /// Maximum concurrently open tabs
    #[arg(long, default_value_t = DEFAULT_MAX_TABS)]
    max_tabs: usize,

    /// Resident memory ceiling in MiB
    #[arg(long, default_value_t = DEFAULT_MEMORY_LIMIT_MIB)]
    memory_limit: u64,

    /// Browser executable
    #[arg(long, env = "CHROMIUM_PATH")]
    chrome_path: Option<PathBuf>,

    /// Plan output file
    #[arg(short = 'o', long, default_value = PLAN_FILE_NAME)]
    output: PathBuf,
}

impl GenerateArgs {
    fn into_config(self) -> Result<GenerationConfig, kodegen_tools_bundleplan::GenerateError> {
        let mut builder = GenerationConfig::builder()
            .cms_url(self.cms_url)
            .category_url(self.category_url)
            .product_url(self.product_url)
            .debug(self.debug)
            .headless(!self.debug)
            .screenshot(self.screenshot)
            .screenshot_dir(self.screenshot_path)
            .skip_checkout(self.skip_checkout)
            .include_mixins(!self.no_mixins)
            .max_tabs(self.max_tabs)
            .memory_limit_mib(self.memory_limit)
            .output_path(self.output);

        if let Some(url) = self.search_url {
            builder = builder.search_url(url);
        }
        for url in self.checkout_urls {
            builder = builder.checkout_url(url);
        }
        let auth_given = self.auth_username.is_some() || self.auth_password.is_some();
        let credentials = Credentials::from_parts(self.auth_username, self.auth_password);
        if auth_given && credentials.is_none() {
            warn!("Basic auth needs both a username and a password; sending no credentials");
        }
        builder = builder.maybe_credentials(credentials);
        if let Some(list) = self.excluded_modules.as_deref() {
            builder = builder.excluded_modules_csv(list);
        }
        if let Some(ms) = self.timeout {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        for name in self.skip {
            builder = builder.skip_collector(name);
        }
        for pattern in self.block {
            builder = builder.block_resource(pattern);
        }
        if let Some(path) = self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder.build()
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    // CDP connection chatter is never useful at info level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{default_level},chromiumoxide::conn=off,chromiumoxide::handler=off"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let Cli { command } = Cli::parse();

    match command {
        Command::Generate(args) => {
            init_tracing(args.debug);

            let config = match args.into_config() {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("{e}");
                    return ExitCode::FAILURE;
                }
            };

            match generate(config).await {
                Ok(plan) => {
                    tracing::info!("Generated plan with {} bundles", plan.len());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Generation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
