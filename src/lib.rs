pub mod browser_setup;
pub mod collector;
pub mod config;
pub mod engine;
pub mod generation;
pub mod plan;
pub mod tab_pool;
pub mod utils;

use std::sync::Arc;

pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use collector::{
    CheckoutCollector, Collector, CollectorContext, CollectorRegistry, DiscoveryOptions,
    PageCollector, PageLog, discover_modules,
};
pub use config::{Credentials, GenerationConfig, GenerationConfigBuilder, PageTarget, PageType};
pub use engine::{
    AutomationEngine, BrowsingSession, ChromeEngine, LaunchOptions, NavigateOptions, PageEvent,
    PageEventSink, PageHandle, RequestBlockPolicy, WaitCondition,
};
pub use generation::{
    GenerateError, GenerateResult, Generator, MemoryProbe, MemoryStats, NoOpProgress,
    ProgressReporter, ResourceGuard, RunPhase, ShutdownReason, SignalScope, with_timeout,
};
pub use plan::{BundleConfig, BundleUrl, ModuleMap, extract_common_bundle, write_plan};
pub use tab_pool::{Tab, TabId, TabPool, TabState};

/// Launch a browser, collect every configured page type and write the plan
///
/// The plan file is only written when every collector succeeded.
pub async fn generate(config: GenerationConfig) -> GenerateResult<Vec<BundleConfig>> {
    let engine = ChromeEngine::launch(LaunchOptions::from_config(&config))
        .await
        .map_err(GenerateError::Engine)?;
    let engine: Arc<dyn AutomationEngine> = Arc::new(engine);

    let output = config.output_path().to_path_buf();
    let plan = Generator::new(config).run(engine).await?;
    write_plan(&plan, &output).await?;
    Ok(plan)
}
