//! Planner and driver configuration.

use std::path::Path;
use std::time::Duration;

use ai_core::SliceBudget;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::HtnPlannerConfig;

/// Tuning for [`HtnSystem`](crate::HtnSystem), usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtnConfig {
    /// Seconds between replan requests while an agent is running a plan.
    #[serde(default = "default_plan_cooldown")]
    pub plan_cooldown_seconds: f32,

    /// Wall-clock budget for one pass over the planning job queue.
    #[serde(default = "default_queue_budget_ms")]
    pub queue_budget_ms: u64,

    /// Wall-clock budget for a single planning job resume.
    #[serde(default = "default_job_budget_ms")]
    pub job_budget_ms: u64,

    /// Optional deterministic bound: compound tasks expanded per job resume.
    #[serde(default)]
    pub job_budget_steps: Option<u32>,

    /// Agents driven per `update` call.
    #[serde(default = "default_max_updates")]
    pub max_updates_per_tick: usize,

    /// Decomposition depth bound for recursive task networks.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Optional hard cap on planner work per job.
    #[serde(default)]
    pub max_expansions: Option<usize>,
}

fn default_plan_cooldown() -> f32 {
    0.45
}
fn default_queue_budget_ms() -> u64 {
    4
}
fn default_job_budget_ms() -> u64 {
    20
}
fn default_max_updates() -> usize {
    128
}
fn default_max_depth() -> usize {
    HtnPlannerConfig::default().max_depth
}

impl Default for HtnConfig {
    fn default() -> Self {
        Self {
            plan_cooldown_seconds: default_plan_cooldown(),
            queue_budget_ms: default_queue_budget_ms(),
            job_budget_ms: default_job_budget_ms(),
            job_budget_steps: None,
            max_updates_per_tick: default_max_updates(),
            max_depth: default_max_depth(),
            max_expansions: None,
        }
    }
}

impl HtnConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read htn config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse htn config from {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn queue_budget(&self) -> SliceBudget {
        SliceBudget::from_duration(Duration::from_millis(self.queue_budget_ms))
    }

    pub fn job_budget(&self) -> SliceBudget {
        SliceBudget {
            max_duration: Some(Duration::from_millis(self.job_budget_ms)),
            max_steps: self.job_budget_steps,
        }
    }

    pub fn planner(&self) -> HtnPlannerConfig {
        HtnPlannerConfig {
            max_depth: self.max_depth,
            max_expansions: self.max_expansions,
        }
    }
}
