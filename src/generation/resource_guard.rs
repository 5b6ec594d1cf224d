//! Process memory sampling and the memory ceiling check
//!
//! Samples are taken between collectors. There is no managed heap to collect in
//! this process, so "reclaiming" is a best-effort hook on the probe followed by
//! a fresh sample for the logs.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use super::errors::{GenerateError, GenerateResult};
use crate::utils::constants::DEFAULT_MEMORY_LIMIT_MIB;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Snapshot of process memory, all figures in MiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Resident set size of this process
    pub rss: u64,
    /// Virtual memory reserved by this process
    pub virtual_memory: u64,
    /// Resident memory of child processes (the browser and its renderers)
    pub external: u64,
    /// Memory still available to the system
    pub system_available: u64,
}

impl MemoryStats {
    /// Combined resident footprint of this process and its children
    #[must_use]
    pub fn total_resident(&self) -> u64 {
        self.rss + self.external
    }
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rss={}MB virtual={}MB external={}MB available={}MB",
            self.rss, self.virtual_memory, self.external, self.system_available
        )
    }
}

/// Source of memory samples
pub trait MemoryProbe: Send + Sync {
    fn sample(&self) -> MemoryStats;

    /// Release whatever cached memory the probe knows how to release
    fn reclaim(&self) {}
}

/// Samples the current process and its descendants through `sysinfo`
pub struct SysinfoProbe {
    system: Mutex<System>,
    pid: Pid,
}

impl SysinfoProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: Pid::from(std::process::id() as usize),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn sample(&self) -> MemoryStats {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_memory(),
        );

        let Some(own) = system.process(self.pid) else {
            warn!("Current process {} not visible to memory sampler", self.pid);
            return MemoryStats {
                system_available: system.available_memory() / BYTES_PER_MIB,
                ..MemoryStats::default()
            };
        };

        // Walk the process table for anything parented (transitively) by us
        let mut descendants = vec![self.pid];
        let mut external = 0;
        let mut grew = true;
        while grew {
            grew = false;
            for (pid, process) in system.processes() {
                if descendants.contains(pid) {
                    continue;
                }
                if process.parent().is_some_and(|parent| descendants.contains(&parent)) {
                    descendants.push(*pid);
                    external += process.memory();
                    grew = true;
                }
            }
        }

        MemoryStats {
            rss: own.memory() / BYTES_PER_MIB,
            virtual_memory: own.virtual_memory() / BYTES_PER_MIB,
            external: external / BYTES_PER_MIB,
            system_available: system.available_memory() / BYTES_PER_MIB,
        }
    }
}

/// Compare a sample against a ceiling
///
/// Only the resident size of this process counts toward the limit.
pub fn check_memory_limit(stats: MemoryStats, limit_mib: u64) -> GenerateResult<MemoryStats> {
    if stats.rss > limit_mib {
        return Err(GenerateError::ResourceExhausted {
            rss_mib: stats.rss,
            limit_mib,
        });
    }
    Ok(stats)
}

/// Memory sampling plus the ceiling enforced between collectors
#[derive(Clone)]
pub struct ResourceGuard {
    probe: Arc<dyn MemoryProbe>,
    limit_mib: u64,
}

impl ResourceGuard {
    /// Guard backed by [`SysinfoProbe`]
    #[must_use]
    pub fn new(limit_mib: u64) -> Self {
        Self::with_probe(Arc::new(SysinfoProbe::new()), limit_mib)
    }

    #[must_use]
    pub fn with_probe(probe: Arc<dyn MemoryProbe>, limit_mib: u64) -> Self {
        Self { probe, limit_mib }
    }

    #[must_use]
    pub fn limit_mib(&self) -> u64 {
        self.limit_mib
    }

    #[must_use]
    pub fn sample(&self) -> MemoryStats {
        self.probe.sample()
    }

    /// Fail with `ResourceExhausted` when resident memory is over the ceiling
    pub fn check_limit(&self) -> GenerateResult<MemoryStats> {
        check_memory_limit(self.sample(), self.limit_mib)
    }

    /// Best-effort reclamation, returning the post-reclaim sample
    pub fn reclaim(&self) -> MemoryStats {
        self.probe.reclaim();
        let stats = self.sample();
        debug!("Memory after reclamation: {stats}");
        stats
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_LIMIT_MIB)
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("limit_mib", &self.limit_mib)
            .finish_non_exhaustive()
    }
}
