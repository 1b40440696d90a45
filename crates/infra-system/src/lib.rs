// testmatrix Infrastructure - System Adapters
// Implements: EnvironmentProbe, DependencyManager, TestHarness

pub mod env_report;
pub mod interpreter_probe;
pub mod pip_manager;
pub mod pytest_harness;
pub mod subprocess;

pub use env_report::{current_env_report, render_env_report};
pub use interpreter_probe::InterpreterProbe;
pub use pip_manager::PipDependencyManager;
pub use pytest_harness::PytestHarness;
pub use subprocess::PythonToolchain;
