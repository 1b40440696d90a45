//! Unit tests for the orchestrator state machine

use super::*;
use std::collections::BTreeMap;
use crate::domain::{
    DependencySet, Gate, Implementation, PythonVersion, ReleaseLevel, Scenario, ScenarioIndex,
    Step, TestTarget,
};
use crate::port::dependency_manager::mocks::{Call, CallLog, RecordingDependencyManager};
use crate::port::id_provider::mocks::FixedIdProvider;
use crate::port::test_harness::mocks::RecordingHarness;
use crate::port::time_provider::mocks::SteppingClock;

fn facts(major: u32, minor: u32) -> EnvironmentFacts {
    EnvironmentFacts::new(
        PythonVersion::new(major, minor),
        Implementation::Reference,
        ReleaseLevel::Final,
    )
}

fn scenario(name: &str) -> Scenario {
    Scenario::new(name, TestTarget::path(format!("tests/{name}")))
        .with_dependencies(DependencySet::of(name, [name]))
}

fn orchestrator(
    matrix: &Matrix,
    manager: RecordingDependencyManager,
    harness: RecordingHarness,
) -> Orchestrator {
    Orchestrator::new(
        matrix,
        Arc::new(manager),
        Arc::new(harness),
        Arc::new(SteppingClock::new(1_000, 10)),
        Arc::new(FixedIdProvider("run-1".to_string())),
    )
    .unwrap()
}

#[tokio::test]
async fn test_all_scenarios_pass() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("pytz"))
        .scenario(scenario("numpy"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log.clone()),
    );

    let report = orch.run(&facts(3, 8)).await.unwrap();

    assert_eq!(report.result, RunResult::Completed);
    assert_eq!(report.run_id, "run-1");
    assert_eq!(report.passed(), 2);
    assert!(report.left_installed.is_none());
    assert_eq!(
        log.calls(),
        vec![
            Call::Install("pytz".to_string()),
            Call::Test("tests/pytz".to_string()),
            Call::Remove("pytz".to_string()),
            Call::Install("numpy".to_string()),
            Call::Test("tests/numpy".to_string()),
            Call::Remove("numpy".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_closed_gate_has_no_side_effects() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("py38").gated(Gate::version_equals(3, 8)))
        .scenario(scenario("cover"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log.clone()),
    );

    let report = orch.run(&facts(3, 9)).await.unwrap();

    assert!(report.result.is_completed());
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.scenarios[0].status, OutcomeStatus::Skipped);
    assert_eq!(report.scenarios[0].duration_ms, 0);
    assert!(log
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::Install(n) | Call::Remove(n) if n == "py38")));
    assert_eq!(log.calls().len(), 3);
}

#[tokio::test]
async fn test_test_failure_aborts_without_removal() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("pytz"))
        .scenario(scenario("numpy"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log.clone()).failing_on("tests/pytz"),
    );

    let report = orch.run(&facts(3, 8)).await.unwrap();

    match &report.result {
        RunResult::Aborted {
            at,
            scenario,
            step,
            cause,
        } => {
            assert_eq!(*at, ScenarioIndex::new(1));
            assert_eq!(scenario, "pytz");
            assert_eq!(*step, Step::Testing);
            assert!(matches!(cause, StepFailure::Test(_)));
        }
        other => panic!("expected abort, got {other:?}"),
    }

    // No compensating removal, and the next scenario never starts
    assert_eq!(
        log.calls(),
        vec![
            Call::Install("pytz".to_string()),
            Call::Test("tests/pytz".to_string()),
        ]
    );
    assert_eq!(
        report.left_installed.as_ref().map(|s| s.name.as_str()),
        Some("pytz")
    );
    assert_eq!(report.scenarios.len(), 1);
}

#[tokio::test]
async fn test_removal_failure_is_fatal() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("pytz"))
        .scenario(scenario("numpy"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()).failing_remove("pytz"),
        RecordingHarness::new(log.clone()),
    );

    let report = orch.run(&facts(3, 8)).await.unwrap();

    assert!(matches!(
        report.result,
        RunResult::Aborted {
            step: Step::Removing,
            cause: StepFailure::Remove(_),
            ..
        }
    ));
    assert_eq!(report.result.exit_code(), 1);
    assert_eq!(log.installs(), 1);
    assert!(!log.calls().contains(&Call::Install("numpy".to_string())));
}

#[tokio::test]
async fn test_overlay_passed_per_scenario() {
    let log = CallLog::new();
    let harness = Arc::new(RecordingHarness::new(log.clone()));
    let matrix = Matrix::default()
        .scenario(scenario("optimized").with_env("PYTHONOPTIMIZE", "2"))
        .scenario(scenario("plain"));
    let orch = Orchestrator::new(
        &matrix,
        Arc::new(RecordingDependencyManager::new(log.clone())),
        harness.clone(),
        Arc::new(SteppingClock::new(0, 1)),
        Arc::new(FixedIdProvider("run-2".to_string())),
    )
    .unwrap();

    orch.run(&facts(3, 8)).await.unwrap();

    let overlays = harness.overlays();
    assert_eq!(overlays.len(), 2);
    assert_eq!(overlays[0].get("PYTHONOPTIMIZE").map(String::as_str), Some("2"));
    assert!(overlays[1].is_empty());
}

#[test]
fn test_invalid_matrix_rejected() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("pytz"))
        .scenario(scenario("pytz"));

    let result = Orchestrator::new(
        &matrix,
        Arc::new(RecordingDependencyManager::new(log.clone())),
        Arc::new(RecordingHarness::new(log)),
        Arc::new(SteppingClock::new(0, 1)),
        Arc::new(FixedIdProvider("run-3".to_string())),
    );
    assert!(matches!(result, Err(MatrixError::Domain(_))));
}

#[test]
fn test_scenario_and_step_durations_from_clock() {
    let log = CallLog::new();
    let matrix = Matrix::default().scenario(scenario("cover"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log.clone()),
    );

    let report = tokio_test::block_on(orch.run(&facts(3, 8))).unwrap();
    assert!(report.result.is_completed());
    assert!(report.finished_at > report.started_at);
    // Clock reads: scenario start, after install, after tests, after removal, scenario end
    let outcome = &report.scenarios[0];
    assert_eq!(outcome.duration_ms, 40);
    assert_eq!(
        outcome.step_durations_ms,
        BTreeMap::from([
            (Step::Installing, 10),
            (Step::Testing, 10),
            (Step::Removing, 10),
        ])
    );
}

#[test]
fn test_failed_scenario_times_only_reached_steps() {
    let log = CallLog::new();
    let matrix = Matrix::default().scenario(scenario("numpy"));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log).failing_on("tests/numpy"),
    );

    let report = tokio_test::block_on(orch.run(&facts(3, 8))).unwrap();
    let outcome = &report.scenarios[0];
    assert_eq!(
        outcome.step_durations_ms,
        BTreeMap::from([(Step::Installing, 10), (Step::Testing, 10)])
    );
}

#[test]
fn test_plan_calls_no_collaborator() {
    let log = CallLog::new();
    let matrix = Matrix::default()
        .scenario(scenario("pytz"))
        .scenario(scenario("django").gated(Gate::version_equals(3, 8)));
    let orch = orchestrator(
        &matrix,
        RecordingDependencyManager::new(log.clone()),
        RecordingHarness::new(log.clone()),
    );

    let entries = orch.plan(&facts(3, 9));

    assert_eq!(orch.scenarios().len(), 2);
    assert_eq!(entries[0].verdict, crate::application::Verdict::Run);
    assert_eq!(entries[1].verdict, crate::application::Verdict::Skip);
    assert!(log.calls().is_empty());
}
