// Domain Layer - Pure orchestration model

pub mod dependency;
pub mod error;
pub mod facts;
pub mod failure;
pub mod gate;
pub mod report;
pub mod run;
pub mod scenario;

// Re-exports
pub use dependency::{DependencySet, Package};
pub use error::DomainError;
pub use facts::{EnvironmentFacts, Implementation, PythonVersion, ReleaseLevel};
pub use failure::{ConfigurationError, InstallError, RemoveError, StepFailure, TestFailure};
pub use gate::Gate;
pub use report::{OutcomeStatus, RunReport, ScenarioOutcome};
pub use run::{ActiveEnvironment, RunResult, RunState, ScenarioIndex, Step};
pub use scenario::{
    EnvOverlay, Matrix, MatrixEntry, PlannedScenario, Scenario, ScenarioBlock, TestTarget,
};
