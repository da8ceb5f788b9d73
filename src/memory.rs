//! Process memory monitoring.
//!
//! Model weights and activations dominate the footprint, so a single
//! resident-set reading of this process is enough to decide whether another
//! synthesis can safely start.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_WARN_MB: u64 = 4096;
pub const DEFAULT_LIMIT_MB: u64 = 6144;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryThresholds {
    /// Log a warning at or above this RSS.
    pub warn_mb: u64,
    /// Refuse new work at or above this RSS.
    pub limit_mb: u64,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            warn_mb: DEFAULT_WARN_MB,
            limit_mb: DEFAULT_LIMIT_MB,
        }
    }
}

impl MemoryThresholds {
    pub fn new(warn_mb: u64, limit_mb: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(limit_mb > 0, "memory limit must be > 0 MB");
        anyhow::ensure!(
            warn_mb <= limit_mb,
            "memory warn threshold ({warn_mb} MB) exceeds limit ({limit_mb} MB)"
        );
        Ok(Self { warn_mb, limit_mb })
    }

    pub fn classify(&self, rss_mb: f64) -> MemoryLevel {
        if rss_mb >= self.limit_mb as f64 {
            MemoryLevel::Critical
        } else if rss_mb >= self.warn_mb as f64 {
            MemoryLevel::Elevated
        } else {
            MemoryLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryLevel {
    Normal,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryReport {
    pub rss_mb: f64,
    pub level: MemoryLevel,
    pub thresholds: MemoryThresholds,
}

/// Samples the resident set size of the current process.
pub struct MemoryMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    thresholds: MemoryThresholds,
}

impl MemoryMonitor {
    pub fn new(thresholds: MemoryThresholds) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Memory monitoring unavailable: {e}");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> MemoryThresholds {
        self.thresholds
    }

    /// Current RSS in megabytes, if the platform reports it.
    pub fn rss_mb(&self) -> Option<f64> {
        let pid = self.pid?;
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system
            .process(pid)
            .map(|process| process.memory() as f64 / BYTES_PER_MB)
    }

    /// Read and classify the current RSS. An unreadable RSS reports as
    /// zero / normal.
    pub fn snapshot(&self) -> MemoryReport {
        let rss_mb = self.rss_mb().unwrap_or(0.0);
        MemoryReport {
            rss_mb,
            level: self.thresholds.classify(rss_mb),
            thresholds: self.thresholds,
        }
    }

    /// Refuse to start new work when memory is critical.
    pub fn ensure_headroom(&self) -> PipelineResult<MemoryReport> {
        let report = self.snapshot();
        match report.level {
            MemoryLevel::Critical => {
                tracing::error!(
                    rss_mb = report.rss_mb,
                    limit_mb = self.thresholds.limit_mb,
                    "Memory limit reached, refusing synthesis"
                );
                Err(PipelineError::MemoryPressure {
                    rss_mb: report.rss_mb,
                    limit_mb: self.thresholds.limit_mb,
                })
            }
            MemoryLevel::Elevated => {
                tracing::warn!(
                    rss_mb = report.rss_mb,
                    warn_mb = self.thresholds.warn_mb,
                    "Memory usage elevated"
                );
                Ok(report)
            }
            MemoryLevel::Normal => Ok(report),
        }
    }

    /// Log the current RSS with a label for the pipeline stage.
    pub fn log_usage(&self, stage: &str) -> MemoryReport {
        let report = self.snapshot();
        tracing::info!(
            stage,
            rss_mb = %format!("{:.1}", report.rss_mb),
            level = ?report.level,
            "Process memory"
        );
        report
    }
}
