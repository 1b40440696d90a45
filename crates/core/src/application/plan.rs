// Dry-run plan: which scenarios would run under the given facts

use serde::Serialize;

use crate::domain::{EnvironmentFacts, PlannedScenario, ScenarioIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Run,
    Skip,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Run => write!(f, "run"),
            Verdict::Skip => write!(f, "skip"),
        }
    }
}

/// One row of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub index: ScenarioIndex,
    pub name: String,
    pub block: Option<String>,
    pub gate: String,
    pub verdict: Verdict,
    pub install: String,
    pub target: String,
    pub remove: String,
}

/// Evaluate every gate against `facts`. Calls no collaborator.
pub fn plan_entries(scenarios: &[PlannedScenario], facts: &EnvironmentFacts) -> Vec<PlanEntry> {
    scenarios
        .iter()
        .map(|planned| PlanEntry {
            index: planned.index,
            name: planned.scenario.name.clone(),
            block: planned.block.clone(),
            gate: planned
                .gate
                .as_ref()
                .map_or_else(|| "always".to_string(), ToString::to_string),
            verdict: if planned.should_run(facts) {
                Verdict::Run
            } else {
                Verdict::Skip
            },
            install: planned.scenario.install.to_string(),
            target: planned.scenario.target.to_string(),
            remove: planned.scenario.remove.to_string(),
        })
        .collect()
}
