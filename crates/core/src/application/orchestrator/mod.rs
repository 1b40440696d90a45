//! Orchestrator - runs the scenario matrix top-to-bottom
//!
//! For each scenario: evaluate its gate, then install -> test -> remove.
//! The first failing step aborts the whole run.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::domain::{
    ActiveEnvironment, DomainError, EnvironmentFacts, Matrix, OutcomeStatus, PlannedScenario,
    RunReport, RunResult, RunState, ScenarioOutcome, Step, StepFailure,
};
use crate::error::{MatrixError, Result};
use crate::port::{DependencyManager, IdProvider, TestHarness, TimeProvider};

use super::plan::{plan_entries, PlanEntry};

#[cfg(test)]
mod tests;

/// Why a scenario stopped early
enum ScenarioError {
    /// A collaborator reported failure (aborts the run)
    Failed(StepFailure),
    /// State machine misuse
    Internal(MatrixError),
}

impl From<DomainError> for ScenarioError {
    fn from(err: DomainError) -> Self {
        ScenarioError::Internal(err.into())
    }
}

pub struct Orchestrator {
    scenarios: Vec<PlannedScenario>,
    dependency_manager: Arc<dyn DependencyManager>,
    test_harness: Arc<dyn TestHarness>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl Orchestrator {
    /// Create an orchestrator over a validated matrix
    ///
    /// # Errors
    /// - MatrixError::Domain if the matrix fails validation
    pub fn new(
        matrix: &Matrix,
        dependency_manager: Arc<dyn DependencyManager>,
        test_harness: Arc<dyn TestHarness>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Result<Self> {
        matrix.validate()?;
        Ok(Self {
            scenarios: matrix.plan(),
            dependency_manager,
            test_harness,
            time_provider,
            id_provider,
        })
    }

    pub fn scenarios(&self) -> &[PlannedScenario] {
        &self.scenarios
    }

    /// Gate verdicts for every scenario, without side effects
    pub fn plan(&self, facts: &EnvironmentFacts) -> Vec<PlanEntry> {
        plan_entries(&self.scenarios, facts)
    }

    /// Run every scenario in order
    ///
    /// Fail-fast, not fail-safe: when a step fails the run stops at once and
    /// no compensating removal is attempted, so a half-installed environment
    /// stays in place for inspection. The set still installed is reported in
    /// `RunReport::left_installed`.
    ///
    /// Step failures end up in `RunReport::result`; the `Err` case is
    /// reserved for state machine misuse.
    pub async fn run(&self, facts: &EnvironmentFacts) -> Result<RunReport> {
        let run_id = self.id_provider.generate_id();
        let span = tracing::info_span!("matrix_run", run_id = %run_id);
        self.run_inner(run_id, facts).instrument(span).await
    }

    async fn run_inner(&self, run_id: String, facts: &EnvironmentFacts) -> Result<RunReport> {
        let started_at = self.time_provider.now_millis();
        info!(
            facts = %facts,
            scenarios = self.scenarios.len(),
            "Starting matrix run"
        );

        let mut state = RunState::new();
        let mut environment = ActiveEnvironment::new();
        let mut outcomes = Vec::with_capacity(self.scenarios.len());

        for planned in &self.scenarios {
            let scenario = &planned.scenario;

            if !planned.should_run(facts) {
                info!(
                    index = %planned.index,
                    scenario = %scenario.name,
                    gate = ?planned.gate.as_ref().map(ToString::to_string),
                    "Gate closed, skipping scenario"
                );
                state.skip()?;
                outcomes.push(outcome(planned, OutcomeStatus::Skipped, 0, BTreeMap::new()));
                continue;
            }

            let scenario_start = self.time_provider.now_millis();
            state.begin()?;
            let mut step_durations = BTreeMap::new();
            let executed = self
                .run_scenario(
                    planned,
                    scenario_start,
                    &mut step_durations,
                    &mut state,
                    &mut environment,
                )
                .await;
            let duration_ms = self.time_provider.now_millis() - scenario_start;

            match executed {
                Ok(()) => {
                    info!(
                        index = %planned.index,
                        scenario = %scenario.name,
                        duration_ms = duration_ms,
                        "Scenario passed"
                    );
                    outcomes.push(outcome(
                        planned,
                        OutcomeStatus::Passed,
                        duration_ms,
                        step_durations,
                    ));
                }
                Err(ScenarioError::Internal(err)) => return Err(err),
                Err(ScenarioError::Failed(cause)) => {
                    let step = state.abort(cause.clone())?;
                    warn!(
                        index = %planned.index,
                        scenario = %scenario.name,
                        step = %step,
                        error = %cause,
                        "Scenario failed, aborting run"
                    );
                    if let Some(dirty) = environment.active() {
                        warn!(
                            dependencies = %dirty,
                            "Leaving dependency set installed for post-mortem inspection"
                        );
                    }
                    outcomes.push(outcome(
                        planned,
                        OutcomeStatus::Failed {
                            step,
                            reason: cause.to_string(),
                        },
                        duration_ms,
                        step_durations,
                    ));
                    let result = RunResult::Aborted {
                        at: planned.index,
                        scenario: scenario.name.clone(),
                        step,
                        cause,
                    };
                    return Ok(self.report(
                        run_id,
                        started_at,
                        facts,
                        outcomes,
                        result,
                        environment.release(),
                    ));
                }
            }
        }

        state.complete()?;
        info!(scenarios = outcomes.len(), "Matrix run completed");
        Ok(self.report(
            run_id,
            started_at,
            facts,
            outcomes,
            RunResult::Completed,
            None,
        ))
    }

    /// install -> test -> remove for one scenario whose gate is open
    ///
    /// Each step reached, failed or not, gets an entry in `step_durations`.
    async fn run_scenario(
        &self,
        planned: &PlannedScenario,
        started_at: i64,
        step_durations: &mut BTreeMap<Step, i64>,
        state: &mut RunState,
        environment: &mut ActiveEnvironment,
    ) -> std::result::Result<(), ScenarioError> {
        let scenario = &planned.scenario;

        environment.acquire(&scenario.install)?;
        info!(
            index = %planned.index,
            scenario = %scenario.name,
            dependencies = %scenario.install,
            "Installing dependencies"
        );
        let installed = self.dependency_manager.install(&scenario.install).await;
        let mark = self.record_step(Step::Installing, started_at, step_durations);
        installed.map_err(|e| ScenarioError::Failed(e.into()))?;
        state.advance()?;

        info!(
            index = %planned.index,
            scenario = %scenario.name,
            test_target = %scenario.target,
            overlay = ?scenario.overlay,
            "Running tests"
        );
        let tested = self
            .test_harness
            .run(&scenario.target, &scenario.overlay)
            .await;
        let mark = self.record_step(Step::Testing, mark, step_durations);
        tested.map_err(|e| ScenarioError::Failed(e.into()))?;
        state.advance()?;

        info!(
            index = %planned.index,
            scenario = %scenario.name,
            dependencies = %scenario.remove,
            "Removing dependencies"
        );
        let removed = self.dependency_manager.remove(&scenario.remove).await;
        self.record_step(Step::Removing, mark, step_durations);
        removed.map_err(|e| ScenarioError::Failed(e.into()))?;
        environment.release();
        state.advance()?;

        Ok(())
    }

    /// Store the time since `since` for `step`; returns the new mark
    fn record_step(
        &self,
        step: Step,
        since: i64,
        step_durations: &mut BTreeMap<Step, i64>,
    ) -> i64 {
        let now = self.time_provider.now_millis();
        step_durations.insert(step, now - since);
        now
    }

    fn report(
        &self,
        run_id: String,
        started_at: i64,
        facts: &EnvironmentFacts,
        scenarios: Vec<ScenarioOutcome>,
        result: RunResult,
        left_installed: Option<crate::domain::DependencySet>,
    ) -> RunReport {
        RunReport {
            run_id,
            started_at,
            finished_at: self.time_provider.now_millis(),
            facts: *facts,
            scenarios,
            result,
            left_installed,
        }
    }
}

fn outcome(
    planned: &PlannedScenario,
    status: OutcomeStatus,
    duration_ms: i64,
    step_durations_ms: BTreeMap<Step, i64>,
) -> ScenarioOutcome {
    ScenarioOutcome {
        index: planned.index,
        name: planned.scenario.name.clone(),
        block: planned.block.clone(),
        status,
        duration_ms,
        step_durations_ms,
    }
}
