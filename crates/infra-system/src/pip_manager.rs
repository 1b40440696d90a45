// pip-backed DependencyManager
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use testmatrix_core::domain::{DependencySet, EnvOverlay, InstallError, RemoveError};
use testmatrix_core::port::{DependencyManager, PackageOperation, TimeProvider};

use crate::subprocess::{tail, OutputMode, PythonToolchain, SubprocessRunner, MAX_REASON_BYTES};

/// Installs with `python -m pip install`, removes with `python -m pip uninstall -y`
pub struct PipDependencyManager {
    runner: SubprocessRunner,
}

impl PipDependencyManager {
    pub fn new(toolchain: PythonToolchain, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            runner: SubprocessRunner::new(toolchain, time_provider),
        }
    }

    /// Arguments after the interpreter. Removal ignores version pins.
    pub fn pip_args(operation: PackageOperation, set: &DependencySet) -> Vec<String> {
        let mut args = vec!["-m".to_string(), "pip".to_string()];
        match operation {
            PackageOperation::Install => {
                args.push("install".to_string());
                args.extend(set.requirements());
            }
            PackageOperation::Remove => {
                args.push("uninstall".to_string());
                args.push("-y".to_string());
                args.extend(set.names());
            }
        }
        args
    }

    /// Run one pip operation; `Err` carries the structured failure reason
    async fn apply(
        &self,
        operation: PackageOperation,
        set: &DependencySet,
    ) -> Result<(), (Option<i32>, String)> {
        if set.is_empty() {
            debug!(set = %set.name, operation = %operation, "Empty dependency set, nothing to do");
            return Ok(());
        }

        let args = Self::pip_args(operation, set);
        let outcome = self
            .runner
            .run_python(&args, &EnvOverlay::new(), OutputMode::Stream)
            .await
            .map_err(|e| {
                (
                    None,
                    format!("failed to spawn {}: {e}", self.runner.python()),
                )
            })?;

        if outcome.success() {
            return Ok(());
        }

        warn!(
            set = %set.name,
            operation = %operation,
            status = %outcome.describe(),
            "pip operation failed"
        );
        let detail = tail(&outcome.stderr, MAX_REASON_BYTES);
        let reason = if detail.is_empty() {
            format!("pip {operation} {}", outcome.describe())
        } else {
            format!("pip {operation} {}: {detail}", outcome.describe())
        };
        Err((outcome.exit_code(), reason))
    }
}

#[async_trait]
impl DependencyManager for PipDependencyManager {
    async fn install(&self, set: &DependencySet) -> Result<(), InstallError> {
        self.apply(PackageOperation::Install, set)
            .await
            .map_err(|(exit_code, reason)| InstallError {
                set: set.name.clone(),
                exit_code,
                reason,
            })
    }

    async fn remove(&self, set: &DependencySet) -> Result<(), RemoveError> {
        self.apply(PackageOperation::Remove, set)
            .await
            .map_err(|(exit_code, reason)| RemoveError {
                set: set.name.clone(),
                exit_code,
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testmatrix_core::domain::Package;
    use testmatrix_core::port::time_provider::SystemTimeProvider;

    fn django() -> DependencySet {
        DependencySet::new(
            "django",
            vec![Package::pinned("django", "3.0.8"), Package::new("sqlparse")],
        )
    }

    #[test]
    fn test_install_args_keep_pins() {
        assert_eq!(
            PipDependencyManager::pip_args(PackageOperation::Install, &django()),
            vec!["-m", "pip", "install", "django==3.0.8", "sqlparse"]
        );
    }

    #[test]
    fn test_remove_args_drop_pins() {
        assert_eq!(
            PipDependencyManager::pip_args(PackageOperation::Remove, &django()),
            vec!["-m", "pip", "uninstall", "-y", "django", "sqlparse"]
        );
    }

    #[tokio::test]
    async fn test_empty_set_does_not_spawn() {
        let manager = PipDependencyManager::new(
            PythonToolchain {
                python: "/nonexistent/python".to_string(),
                ..PythonToolchain::default()
            },
            Arc::new(SystemTimeProvider),
        );
        let empty = DependencySet::empty("cover");

        assert!(manager.install(&empty).await.is_ok());
        assert!(manager.remove(&empty).await.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_install_error() {
        let manager = PipDependencyManager::new(
            PythonToolchain {
                python: "/nonexistent/python".to_string(),
                ..PythonToolchain::default()
            },
            Arc::new(SystemTimeProvider),
        );

        let err = manager
            .install(&DependencySet::of("pytz", ["pytz"]))
            .await
            .unwrap_err();
        assert_eq!(err.set, "pytz");
        assert_eq!(err.exit_code, None);
        assert!(err.reason.contains("failed to spawn"));
    }
}
