// Run report (diagnostic artifact, written once per run)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dependency::DependencySet;
use super::facts::EnvironmentFacts;
use super::run::{RunResult, ScenarioIndex, Step};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Skipped,
    Passed,
    Failed { step: Step, reason: String },
}

/// What happened to one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub index: ScenarioIndex,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    pub duration_ms: i64,
    /// Time spent in each step the scenario reached, failed step included
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub step_durations_ms: BTreeMap<Step, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: i64,  // epoch ms
    pub finished_at: i64, // epoch ms
    pub facts: EnvironmentFacts,
    pub scenarios: Vec<ScenarioOutcome>,
    pub result: RunResult,
    /// Dependency set still installed after an abort
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_installed: Option<DependencySet>,
}

impl RunReport {
    pub fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.scenarios.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Passed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped))
    }
}
