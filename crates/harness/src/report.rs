//! Run report
//!
//! Collects the outcome records, per-phase timings and eviction status of
//! one run. Serializable to JSON for machine consumption.

use crate::config::HarnessConfig;
use serde::Serialize;
use stalefh_core::{OutcomeRecord, Phase, Verdict};
use std::path::PathBuf;
use std::time::Duration;

/// Timing of one completed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    /// Phase that completed
    pub phase: Phase,
    /// Operations issued during the phase
    pub operations: usize,
    /// Wall-clock duration in microseconds
    pub duration_us: u64,
}

impl PhaseTiming {
    /// Create a timing entry
    pub fn new(phase: Phase, operations: usize, elapsed: Duration) -> Self {
        PhaseTiming {
            phase,
            operations,
            duration_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        }
    }
}

/// Whether the cache eviction request went through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvictionStatus {
    /// The evictor reported success
    Completed,
    /// The evictor reported an error; the run continued anyway
    Failed {
        /// Error description
        message: String,
    },
}

/// Result of a run that got through setup
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Target directory
    pub target: PathBuf,
    /// Configuration the run used
    pub config: HarnessConfig,
    /// References captured
    pub captured: usize,
    /// Cache eviction status
    pub eviction: EvictionStatus,
    /// Timings of completed phases, in execution order
    pub phases: Vec<PhaseTiming>,
    /// One record per captured reference, in index order
    pub outcomes: Vec<OutcomeRecord>,
}

impl RunReport {
    /// Aggregate verdict
    pub fn verdict(&self) -> Verdict {
        Verdict::from_records(&self.outcomes)
    }

    /// Check if every record passed
    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    /// Records classified as failures
    pub fn failures(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.outcomes.iter().filter(|r| !r.is_pass())
    }

    /// Number of failing records
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Timing of a phase, if it completed
    pub fn timing(&self, phase: Phase) -> Option<&PhaseTiming> {
        self.phases.iter().find(|t| t.phase == phase)
    }

    /// Get a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "verdict={:?}, objects={}, captured={}, failures={}, flush_passes={}, eviction={}",
            self.verdict(),
            self.config.object_count,
            self.captured,
            self.failure_count(),
            self.config.flush_passes,
            match &self.eviction {
                EvictionStatus::Completed => "completed",
                EvictionStatus::Failed { .. } => "failed",
            }
        )
    }

    /// Serialize the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
