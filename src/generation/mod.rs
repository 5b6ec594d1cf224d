//! Plan generation: run orchestration and the guards around it

pub mod cleanup;
pub mod errors;
pub mod orchestrator;
pub mod page_timeout;
pub mod progress;
pub mod resource_guard;
pub mod shutdown;

pub use cleanup::{CleanupResult, teardown};
pub use errors::{GenerateError, GenerateResult};
pub use orchestrator::Generator;
pub use page_timeout::with_timeout;
pub use progress::{NoOpProgress, ProgressReporter, RunPhase};
pub use resource_guard::{MemoryProbe, MemoryStats, ResourceGuard, SysinfoProbe, check_memory_limit};
pub use shutdown::{ShutdownReason, SignalScope};
