//! Generation run orchestration
//!
//! Coordinates one run end to end:
//! - Isolated session and tab pool setup
//! - Sequential collector execution under per-collector deadlines
//! - Memory checks between collectors
//! - Whole-run deadline and termination requests
//! - Teardown on every exit path, then shared-module extraction

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use super::cleanup::{CleanupResult, teardown};
use super::errors::{GenerateError, GenerateResult};
use super::page_timeout::with_timeout;
use super::progress::{NoOpProgress, ProgressReporter, RunPhase};
use super::resource_guard::ResourceGuard;
use super::shutdown::{ShutdownReason, SignalScope};
use crate::collector::{CollectorContext, CollectorRegistry};
use crate::config::GenerationConfig;
use crate::engine::{AutomationEngine, BrowsingSession};
use crate::plan::{BundleConfig, extract_common_bundle};
use crate::tab_pool::TabPool;

/// Runs the registered collectors against one browser and produces the plan
pub struct Generator<P: ProgressReporter = NoOpProgress> {
    config: GenerationConfig,
    registry: CollectorRegistry,
    guard: ResourceGuard,
    progress: P,
}

impl Generator<NoOpProgress> {
    /// Generator with the standard collectors (minus skipped ones) and a
    /// `sysinfo`-backed resource guard
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            registry: CollectorRegistry::for_config(&config),
            guard: ResourceGuard::new(config.memory_limit_mib()),
            config,
            progress: NoOpProgress,
        }
    }
}

impl<P: ProgressReporter> Generator<P> {
    #[must_use]
    pub fn with_registry(mut self, registry: CollectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_resource_guard(mut self, guard: ResourceGuard) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn with_progress<Q: ProgressReporter>(self, progress: Q) -> Generator<Q> {
        Generator {
            config: self.config,
            registry: self.registry,
            guard: self.guard,
            progress,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }

    /// Run until done, failed, timed out, or interrupted by SIGINT/SIGTERM/SIGHUP
    ///
    /// Signal delivery to this run stops when it returns.
    pub async fn run(
        &self,
        engine: Arc<dyn AutomationEngine>,
    ) -> GenerateResult<Vec<BundleConfig>> {
        let mut signals = SignalScope::install()?;
        self.run_until(engine, signals.recv()).await
    }

    /// Run until done, failed, timed out, or `shutdown` resolves
    ///
    /// The engine is closed before this returns, whatever the outcome.
    pub async fn run_until<S>(
        &self,
        engine: Arc<dyn AutomationEngine>,
        shutdown: S,
    ) -> GenerateResult<Vec<BundleConfig>>
    where
        S: Future<Output = ShutdownReason>,
    {
        let started = Instant::now();
        self.progress.report_phase(&RunPhase::Starting);
        info!("Starting generation. Initial memory: {}", self.guard.sample());

        let session = match engine.new_isolated_session().await {
            Ok(session) => session,
            Err(e) => {
                let err = GenerateError::Engine(e.context("Failed to create isolated session"));
                self.report_failure(&err);
                self.finish_teardown(None, None, engine.as_ref()).await;
                self.progress.report_phase(&RunPhase::Failed);
                return Err(err);
            }
        };
        let pool = TabPool::new(Arc::clone(&session), self.config.max_tabs());

        let outcome = tokio::select! {
            result = with_timeout(
                self.collect_all(session.as_ref(), &pool),
                self.config.run_timeout(),
                "Overall generation process",
            ) => result,
            reason = shutdown => {
                warn!("Received {reason}. Cleaning up browser resources...");
                self.progress.report_phase(&RunPhase::Aborting {
                    reason: reason.to_string(),
                });
                Err(GenerateError::Aborted {
                    signal: reason.to_string(),
                })
            }
        };

        if let Err(e) = &outcome {
            self.report_failure(e);
        }

        self.finish_teardown(Some(&pool), Some(session.as_ref()), engine.as_ref())
            .await;

        let bundles = match outcome {
            Ok(bundles) => bundles,
            Err(e) => {
                self.progress.report_phase(&RunPhase::Failed);
                return Err(e);
            }
        };

        self.progress.report_phase(&RunPhase::Extracting);
        info!("Extracting common module...");
        let plan = extract_common_bundle(bundles);

        for bundle in &plan {
            info!("{}", bundle.summary());
        }
        info!(
            "Generation finished in {:.1}s with {} bundles",
            started.elapsed().as_secs_f64(),
            plan.len()
        );
        self.progress.report_phase(&RunPhase::Done);
        Ok(plan)
    }

    async fn collect_all(
        &self,
        session: &dyn BrowsingSession,
        pool: &TabPool,
    ) -> GenerateResult<Vec<BundleConfig>> {
        let total = self.registry.len();
        let mut bundles = Vec::with_capacity(total);

        for (index, collector) in self.registry.iter().enumerate() {
            let name = collector.name();
            self.progress.report_phase(&RunPhase::Collecting {
                index: index + 1,
                total,
                collector: name.to_string(),
            });
            info!("[{}/{total}] Starting collection for {name}...", index + 1);

            let before = self.guard.check_limit()?;
            debug!("Memory before {name}: {before}");

            let ctx = CollectorContext {
                session,
                config: &self.config,
                pool,
            };
            let label = format!("{name} collector");
            let result = with_timeout(
                collector.collect(ctx),
                self.config.collector_timeout(),
                &label,
            )
            .await;

            // A collector cut off by its deadline never released its tab
            pool.release_outstanding().await;

            match result {
                Ok(bundle) => {
                    let after = self.guard.reclaim();
                    info!(
                        "Completed collection for {name}: {} modules. Memory: {after}",
                        bundle.modules.len()
                    );
                    self.progress.report_collector_completed(&bundle, &after);
                    bundles.push(bundle);
                }
                Err(e) => {
                    error!("FAILED: {name} collector");
                    error!("Error: {e}");
                    if self.config.debug() {
                        error!("Details: {e:?}");
                    }
                    error!("Memory at failure: {}", self.guard.sample());
                    return Err(e);
                }
            }
        }

        Ok(bundles)
    }

    fn report_failure(&self, err: &GenerateError) {
        error!("Generation failed: {err}");
        self.progress.report_error(&err.to_string());
    }

    async fn finish_teardown(
        &self,
        pool: Option<&TabPool>,
        session: Option<&dyn BrowsingSession>,
        engine: &dyn AutomationEngine,
    ) {
        self.progress.report_phase(&RunPhase::TearingDown);
        if let CleanupResult::PartialFailure(errors) = teardown(pool, session, engine).await {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            warn!(
                "Teardown finished with {} error(s): {}",
                errors.len(),
                details.join("; ")
            );
        }
        let stats = self.guard.reclaim();
        info!("Finished, browser closed. Final memory: {stats}");
    }
}
