// pytest-backed TestHarness
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use testmatrix_core::domain::{EnvOverlay, TestFailure, TestTarget};
use testmatrix_core::port::{TestHarness, TimeProvider};

use crate::subprocess::{OutputMode, PythonToolchain, SubprocessRunner};

/// Runs `python -m pytest` with inherited stdio so the harness's own
/// diagnostics go straight to the console
pub struct PytestHarness {
    runner: SubprocessRunner,
    default_args: Vec<String>,
}

impl PytestHarness {
    /// # Arguments
    /// * `toolchain` - Interpreter and working directory
    /// * `time_provider` - Time provider for duration tracking
    /// * `default_args` - Arguments passed to every pytest invocation (e.g. `-n2`)
    pub fn new(
        toolchain: PythonToolchain,
        time_provider: Arc<dyn TimeProvider>,
        default_args: Vec<String>,
    ) -> Self {
        Self {
            runner: SubprocessRunner::new(toolchain, time_provider),
            default_args,
        }
    }

    pub fn pytest_args(&self, target: &TestTarget) -> Vec<String> {
        let mut args = vec!["-m".to_string(), "pytest".to_string()];
        args.extend(self.default_args.iter().cloned());
        args.extend(target.args.iter().cloned());
        if let Some(select) = &target.select {
            args.push("-k".to_string());
            args.push(select.clone());
        }
        args.push(target.path.clone());
        args
    }
}

#[async_trait]
impl TestHarness for PytestHarness {
    async fn run(&self, target: &TestTarget, overlay: &EnvOverlay) -> Result<(), TestFailure> {
        let args = self.pytest_args(target);
        let outcome = self
            .runner
            .run_python(&args, overlay, OutputMode::Inherit)
            .await
            .map_err(|e| TestFailure {
                target: target.to_string(),
                exit_code: None,
                reason: format!("failed to spawn {}: {e}", self.runner.python()),
            })?;

        debug!(
            test_target = %target,
            duration_ms = outcome.duration_ms,
            status = %outcome.describe(),
            "pytest finished"
        );
        if outcome.success() {
            return Ok(());
        }
        Err(TestFailure {
            target: target.to_string(),
            exit_code: outcome.exit_code(),
            reason: format!("pytest {}", outcome.describe()),
        })
    }
}
