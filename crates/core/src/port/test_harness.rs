// Test harness port
// Runs a test target with an environment overlay scoped to that one invocation

use async_trait::async_trait;

use crate::domain::{EnvOverlay, TestFailure, TestTarget};

/// Test Harness trait
///
/// Implementations:
/// - PytestHarness: `python -m pytest ...` in a child process
#[async_trait]
pub trait TestHarness: Send + Sync {
    /// Run the target
    ///
    /// The overlay must apply to this invocation only and never leak into
    /// later invocations or the calling process.
    ///
    /// # Errors
    /// - TestFailure on any non-zero or abnormal completion
    async fn run(&self, target: &TestTarget, overlay: &EnvOverlay) -> Result<(), TestFailure>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::dependency_manager::mocks::{Call, CallLog};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Records calls (and overlays) and fails on configured target paths
    pub struct RecordingHarness {
        log: CallLog,
        fail_on: HashSet<String>,
        overlays: Arc<Mutex<Vec<EnvOverlay>>>,
    }

    impl RecordingHarness {
        pub fn new(log: CallLog) -> Self {
            Self {
                log,
                fail_on: HashSet::new(),
                overlays: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing_on(mut self, target_path: impl Into<String>) -> Self {
            self.fail_on.insert(target_path.into());
            self
        }

        /// Overlays seen so far, one per invocation
        pub fn overlays(&self) -> Vec<EnvOverlay> {
            self.overlays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TestHarness for RecordingHarness {
        async fn run(&self, target: &TestTarget, overlay: &EnvOverlay) -> Result<(), TestFailure> {
            self.log.record(Call::Test(target.path.clone()));
            self.overlays.lock().unwrap().push(overlay.clone());
            if self.fail_on.contains(&target.path) {
                return Err(TestFailure {
                    target: target.path.clone(),
                    exit_code: Some(1),
                    reason: "mock test failure".to_string(),
                });
            }
            Ok(())
        }
    }
}
