// Step failures reported by collaborators
//
// Every failure here is fatal to the run: none is retried or recovered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Package manager could not install a dependency set
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("install of '{set}' failed: {reason}")]
pub struct InstallError {
    pub set: String,
    pub exit_code: Option<i32>,
    pub reason: String,
}

/// Package manager could not remove a dependency set
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("removal of '{set}' failed: {reason}")]
pub struct RemoveError {
    pub set: String,
    pub exit_code: Option<i32>,
    pub reason: String,
}

/// Test harness reported failing, erroring or abnormally terminated tests
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("tests failed for '{target}': {reason}")]
pub struct TestFailure {
    pub target: String,
    pub exit_code: Option<i32>,
    pub reason: String,
}

/// A required fact or setting could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Cannot determine {0}")]
    MissingFact(String),

    #[error("Environment probe failed: {0}")]
    Probe(String),

    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    #[error("Invalid settings: {0}")]
    Settings(String),
}

/// The failure that aborted a run, tagged by the step that produced it
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Test(#[from] TestFailure),

    #[error(transparent)]
    Remove(#[from] RemoveError),
}

impl StepFailure {
    /// Exit code reported by the failing collaborator, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StepFailure::Install(e) => e.exit_code,
            StepFailure::Test(e) => e.exit_code,
            StepFailure::Remove(e) => e.exit_code,
        }
    }
}
