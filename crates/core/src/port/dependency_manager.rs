// Dependency manager port
// Installs or removes a dependency set in the ambient package environment

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DependencySet, InstallError, RemoveError};

/// Operation kind handed to the package-management collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageOperation {
    Install,
    Remove,
}

impl std::fmt::Display for PackageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageOperation::Install => write!(f, "install"),
            PackageOperation::Remove => write!(f, "remove"),
        }
    }
}

/// Dependency Manager trait
///
/// Implementations:
/// - PipDependencyManager: `python -m pip install` / `pip uninstall -y`
///
/// Both operations mutate shared state outside this process. Failures are
/// never swallowed and removal is not best-effort.
#[async_trait]
pub trait DependencyManager: Send + Sync {
    /// Install every package of the set
    ///
    /// # Errors
    /// - InstallError when the package manager completes non-zero
    ///   (network failure, version conflict, unsatisfiable constraint)
    async fn install(&self, set: &DependencySet) -> Result<(), InstallError>;

    /// Remove every package of the set
    ///
    /// # Errors
    /// - RemoveError under the same class of causes as `install`
    async fn remove(&self, set: &DependencySet) -> Result<(), RemoveError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// One collaborator call, in the order it happened
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Install(String),
        Test(String),
        Remove(String),
    }

    /// Call log shared between mock collaborators so cross-port ordering is observable
    #[derive(Debug, Clone, Default)]
    pub struct CallLog {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl CallLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn installs(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Install(_)))
                .count()
        }

        pub fn removes(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Remove(_)))
                .count()
        }
    }

    /// Records calls and fails on configured set names
    pub struct RecordingDependencyManager {
        log: CallLog,
        fail_install: HashSet<String>,
        fail_remove: HashSet<String>,
    }

    impl RecordingDependencyManager {
        pub fn new(log: CallLog) -> Self {
            Self {
                log,
                fail_install: HashSet::new(),
                fail_remove: HashSet::new(),
            }
        }

        pub fn failing_install(mut self, set_name: impl Into<String>) -> Self {
            self.fail_install.insert(set_name.into());
            self
        }

        pub fn failing_remove(mut self, set_name: impl Into<String>) -> Self {
            self.fail_remove.insert(set_name.into());
            self
        }
    }

    #[async_trait]
    impl DependencyManager for RecordingDependencyManager {
        async fn install(&self, set: &DependencySet) -> Result<(), InstallError> {
            self.log.record(Call::Install(set.name.clone()));
            if self.fail_install.contains(&set.name) {
                return Err(InstallError {
                    set: set.name.clone(),
                    exit_code: Some(1),
                    reason: "mock install failure".to_string(),
                });
            }
            Ok(())
        }

        async fn remove(&self, set: &DependencySet) -> Result<(), RemoveError> {
            self.log.record(Call::Remove(set.name.clone()));
            if self.fail_remove.contains(&set.name) {
                return Err(RemoveError {
                    set: set.name.clone(),
                    exit_code: Some(1),
                    reason: "mock removal failure".to_string(),
                });
            }
            Ok(())
        }
    }
}
