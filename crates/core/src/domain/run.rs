// Run state machine (Pending -> Running(step) -> ... -> Completed | Aborted)

use serde::{Deserialize, Serialize};

use super::dependency::DependencySet;
use super::error::{DomainError, Result};
use super::failure::StepFailure;

/// 1-based position of a scenario in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioIndex(usize);

impl ScenarioIndex {
    pub const FIRST: ScenarioIndex = ScenarioIndex(1);

    pub fn new(ordinal: usize) -> Self {
        debug_assert!(ordinal > 0, "scenario indices are 1-based");
        Self(ordinal)
    }

    /// From a 0-based slice position
    pub fn from_position(position: usize) -> Self {
        Self(position + 1)
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for ScenarioIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Installing,
    Testing,
    Removing,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Installing => write!(f, "INSTALLING"),
            Step::Testing => write!(f, "TESTING"),
            Step::Removing => write!(f, "REMOVING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending(ScenarioIndex),
    Running(ScenarioIndex, Step),
    Aborted {
        at: ScenarioIndex,
        step: Step,
        cause: StepFailure,
    },
    Completed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Pending(i) => write!(f, "PENDING({i})"),
            RunState::Running(i, step) => write!(f, "RUNNING({i}, {step})"),
            RunState::Aborted { at, step, .. } => write!(f, "ABORTED({at}, {step})"),
            RunState::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl RunState {
    pub fn new() -> Self {
        RunState::Pending(ScenarioIndex::FIRST)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Aborted { .. } | RunState::Completed)
    }

    fn invalid(&self, to: impl Into<String>) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.to_string(),
            to: to.into(),
        }
    }

    /// Pending(i) -> Pending(i+1), gate evaluated false
    pub fn skip(&mut self) -> Result<()> {
        match *self {
            RunState::Pending(i) => {
                *self = RunState::Pending(i.next());
                Ok(())
            }
            _ => Err(self.invalid("PENDING(next)")),
        }
    }

    /// Pending(i) -> Running(i, Installing)
    pub fn begin(&mut self) -> Result<()> {
        match *self {
            RunState::Pending(i) => {
                *self = RunState::Running(i, Step::Installing);
                Ok(())
            }
            _ => Err(self.invalid("RUNNING(INSTALLING)")),
        }
    }

    /// Installing -> Testing -> Removing -> Pending(i+1)
    pub fn advance(&mut self) -> Result<()> {
        match *self {
            RunState::Running(i, Step::Installing) => {
                *self = RunState::Running(i, Step::Testing);
                Ok(())
            }
            RunState::Running(i, Step::Testing) => {
                *self = RunState::Running(i, Step::Removing);
                Ok(())
            }
            RunState::Running(i, Step::Removing) => {
                *self = RunState::Pending(i.next());
                Ok(())
            }
            _ => Err(self.invalid("next step")),
        }
    }

    /// Running(i, step) -> Aborted(i, step, cause), returning the failed step
    pub fn abort(&mut self, cause: StepFailure) -> Result<Step> {
        match *self {
            RunState::Running(at, step) => {
                *self = RunState::Aborted { at, step, cause };
                Ok(step)
            }
            _ => Err(self.invalid("ABORTED")),
        }
    }

    /// Pending(i) -> Completed once the scenario list is exhausted
    pub fn complete(&mut self) -> Result<()> {
        match *self {
            RunState::Pending(_) => {
                *self = RunState::Completed;
                Ok(())
            }
            _ => Err(self.invalid("COMPLETED")),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Completed,
    Aborted {
        at: ScenarioIndex,
        scenario: String,
        step: Step,
        cause: StepFailure,
    },
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed)
    }

    /// Process exit code: 0 on completion, the failing step's code when it
    /// is a non-zero code, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Completed => 0,
            RunResult::Aborted { cause, .. } => match cause.exit_code() {
                Some(code) if code != 0 => code,
                _ => 1,
            },
        }
    }
}

/// Single-owner slot for the ambient package environment
///
/// A set counts as active from the moment its install is attempted until its
/// removal succeeds. A failed scenario leaves its set active.
#[derive(Debug, Default)]
pub struct ActiveEnvironment {
    active: Option<DependencySet>,
}

impl ActiveEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, set: &DependencySet) -> Result<()> {
        if let Some(active) = &self.active {
            return Err(DomainError::EnvironmentBusy {
                active: active.name.clone(),
                requested: set.name.clone(),
            });
        }
        self.active = Some(set.clone());
        Ok(())
    }

    pub fn release(&mut self) -> Option<DependencySet> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&DependencySet> {
        self.active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::failure::InstallError;

    fn install_failure() -> StepFailure {
        StepFailure::Install(InstallError {
            set: "pytz".to_string(),
            exit_code: Some(2),
            reason: "network unreachable".to_string(),
        })
    }

    #[test]
    fn test_full_scenario_cycle() {
        let mut state = RunState::new();
        assert_eq!(state, RunState::Pending(ScenarioIndex::new(1)));

        state.begin().unwrap();
        assert_eq!(state, RunState::Running(ScenarioIndex::new(1), Step::Installing));
        state.advance().unwrap();
        assert_eq!(state, RunState::Running(ScenarioIndex::new(1), Step::Testing));
        state.advance().unwrap();
        assert_eq!(state, RunState::Running(ScenarioIndex::new(1), Step::Removing));
        state.advance().unwrap();
        assert_eq!(state, RunState::Pending(ScenarioIndex::new(2)));

        state.skip().unwrap();
        assert_eq!(state, RunState::Pending(ScenarioIndex::new(3)));

        state.complete().unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut state = RunState::new();
        assert!(state.advance().is_err());
        assert!(state.abort(install_failure()).is_err());

        state.begin().unwrap();
        assert!(state.skip().is_err());
        assert!(state.complete().is_err());
        assert!(state.begin().is_err());

        assert_eq!(state.abort(install_failure()).unwrap(), Step::Installing);
        assert!(state.is_terminal());
        assert!(state.advance().is_err());
        assert!(state.complete().is_err());

        let err = state.begin().unwrap_err();
        assert!(err.to_string().contains("ABORTED(#1, INSTALLING)"));
    }

    #[test]
    fn test_exit_code_propagation() {
        assert_eq!(RunResult::Completed.exit_code(), 0);

        let aborted = RunResult::Aborted {
            at: ScenarioIndex::new(2),
            scenario: "datetime".to_string(),
            step: Step::Installing,
            cause: install_failure(),
        };
        assert_eq!(aborted.exit_code(), 2);

        let signalled = RunResult::Aborted {
            at: ScenarioIndex::new(1),
            scenario: "cover".to_string(),
            step: Step::Testing,
            cause: StepFailure::Test(crate::domain::TestFailure {
                target: "tests/cover".to_string(),
                exit_code: None,
                reason: "terminated by signal 9".to_string(),
            }),
        };
        assert_eq!(signalled.exit_code(), 1);
    }

    #[test]
    fn test_active_environment_is_exclusive() {
        let mut env = ActiveEnvironment::new();
        let pytz = DependencySet::of("pytz", ["pytz"]);
        let numpy = DependencySet::of("numpy", ["numpy"]);

        env.acquire(&pytz).unwrap();
        let err = env.acquire(&numpy).unwrap_err();
        assert!(matches!(err, DomainError::EnvironmentBusy { .. }));

        assert_eq!(env.release(), Some(pytz));
        assert!(env.active().is_none());
        env.acquire(&numpy).unwrap();
    }

    #[test]
    fn test_run_result_json() {
        let aborted = RunResult::Aborted {
            at: ScenarioIndex::new(2),
            scenario: "datetime".to_string(),
            step: Step::Installing,
            cause: install_failure(),
        };
        let value = serde_json::to_value(&aborted).unwrap();
        assert_eq!(value["status"], "aborted");
        assert_eq!(value["at"], 2);
        assert_eq!(value["step"], "installing");
        assert_eq!(value["cause"]["kind"], "install");
    }
}
