// Environment probe port
// reason: async-trait, probing spawns the interpreter in the real adapter
use async_trait::async_trait;

use crate::domain::{ConfigurationError, EnvironmentFacts};

/// Reads immutable facts about the execution environment
///
/// Called once per run; the facts do not change mid-run.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    /// Capture a facts snapshot
    ///
    /// # Errors
    /// - ConfigurationError if any fact cannot be determined. Implementations
    ///   must not guess a missing fact.
    async fn capture(&self) -> Result<EnvironmentFacts, ConfigurationError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe returning a fixed snapshot (or a fixed error)
    pub struct StaticProbe {
        facts: Result<EnvironmentFacts, ConfigurationError>,
        calls: AtomicUsize,
    }

    impl StaticProbe {
        pub fn new(facts: EnvironmentFacts) -> Self {
            Self {
                facts: Ok(facts),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: ConfigurationError) -> Self {
            Self {
                facts: Err(error),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EnvironmentProbe for StaticProbe {
        async fn capture(&self) -> Result<EnvironmentFacts, ConfigurationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.facts.clone()
        }
    }
}
