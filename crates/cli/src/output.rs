// Human-readable rendering of plans, facts and run reports

use colored::Colorize;
use tabled::{Table, Tabled};

use testmatrix_core::application::{PlanEntry, Verdict};
use testmatrix_core::domain::{OutcomeStatus, RunReport, RunResult};

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Block")]
    block: String,
    #[tabled(rename = "Gate")]
    gate: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Install")]
    install: String,
    #[tabled(rename = "Tests")]
    target: String,
}

pub fn plan_table(entries: &[PlanEntry]) -> String {
    let rows: Vec<PlanRow> = entries
        .iter()
        .map(|entry| PlanRow {
            index: entry.index.to_string(),
            name: entry.name.clone(),
            block: entry.block.clone().unwrap_or_else(|| "-".to_string()),
            gate: entry.gate.clone(),
            verdict: match entry.verdict {
                Verdict::Run => "run".green().to_string(),
                Verdict::Skip => "skip".yellow().to_string(),
            },
            install: entry.install.clone(),
            target: entry.target.clone(),
        })
        .collect();

    Table::new(rows).to_string()
}

pub fn summary(report: &RunReport) -> String {
    let mut lines = Vec::with_capacity(report.scenarios.len() + 4);

    for outcome in &report.scenarios {
        let line = match &outcome.status {
            OutcomeStatus::Passed => format!(
                "{} {} {} ({} ms)",
                "PASS".green().bold(),
                outcome.index,
                outcome.name,
                outcome.duration_ms
            ),
            OutcomeStatus::Skipped => {
                format!("{} {} {}", "SKIP".yellow(), outcome.index, outcome.name)
            }
            OutcomeStatus::Failed { step, reason } => format!(
                "{} {} {} [{}] {}",
                "FAIL".red().bold(),
                outcome.index,
                outcome.name,
                step,
                reason
            ),
        };
        lines.push(line);
    }

    lines.push(String::new());
    match &report.result {
        RunResult::Completed => lines.push(format!(
            "{} {} passed, {} skipped",
            "✓ Completed:".green().bold(),
            report.passed(),
            report.skipped()
        )),
        RunResult::Aborted {
            at,
            scenario,
            step,
            cause,
        } => {
            lines.push(format!(
                "{} scenario {} ({}) failed while {}: {}",
                "✗ Aborted:".red().bold(),
                at,
                scenario,
                step,
                cause
            ));
            if let Some(set) = &report.left_installed {
                lines.push(format!("{} {}", "Left installed:".bold(), set));
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use testmatrix_core::domain::{
        DependencySet, EnvironmentFacts, Implementation, InstallError, PythonVersion,
        ReleaseLevel, ScenarioIndex, ScenarioOutcome, Step, StepFailure,
    };

    fn facts() -> EnvironmentFacts {
        EnvironmentFacts::new(
            PythonVersion::new(3, 8),
            Implementation::Reference,
            ReleaseLevel::Final,
        )
    }

    fn outcome(position: usize, name: &str, status: OutcomeStatus) -> ScenarioOutcome {
        ScenarioOutcome {
            index: ScenarioIndex::from_position(position),
            name: name.to_string(),
            block: None,
            status,
            duration_ms: 5,
            step_durations_ms: Default::default(),
        }
    }

    #[test]
    fn test_summary_completed() {
        colored::control::set_override(false);
        let report = RunReport {
            run_id: "run-1".to_string(),
            started_at: 0,
            finished_at: 10,
            facts: facts(),
            scenarios: vec![
                outcome(0, "cover", OutcomeStatus::Passed),
                outcome(1, "django", OutcomeStatus::Skipped),
            ],
            result: RunResult::Completed,
            left_installed: None,
        };

        let text = summary(&report);
        assert!(text.contains("PASS #1 cover (5 ms)"));
        assert!(text.contains("SKIP #2 django"));
        assert!(text.contains("1 passed, 1 skipped"));
    }

    #[test]
    fn test_summary_aborted_names_left_installed_set() {
        colored::control::set_override(false);
        let set = DependencySet::of("redis", ["fakeredis"]);
        let cause = StepFailure::Install(InstallError {
            set: set.to_string(),
            exit_code: Some(1),
            reason: "pip install exit code 1".to_string(),
        });
        let report = RunReport {
            run_id: "run-2".to_string(),
            started_at: 0,
            finished_at: 10,
            facts: facts(),
            scenarios: vec![outcome(
                0,
                "redis",
                OutcomeStatus::Failed {
                    step: Step::Installing,
                    reason: cause.to_string(),
                },
            )],
            result: RunResult::Aborted {
                at: ScenarioIndex::FIRST,
                scenario: "redis".to_string(),
                step: Step::Installing,
                cause,
            },
            left_installed: Some(set),
        };

        let text = summary(&report);
        assert!(text.contains("FAIL #1 redis [INSTALLING]"));
        assert!(text.contains("Aborted: scenario #1 (redis) failed while INSTALLING"));
        assert!(text.contains("Left installed: redis [fakeredis]"));
    }
}
