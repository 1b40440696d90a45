// Port Layer - Interfaces for external collaborators

pub mod dependency_manager;
pub mod environment_probe;
pub mod id_provider; // For deterministic testing
pub mod test_harness;
pub mod time_provider;

// Re-exports
pub use dependency_manager::{DependencyManager, PackageOperation};
pub use environment_probe::EnvironmentProbe;
pub use id_provider::{IdProvider, UuidProvider};
pub use test_harness::TestHarness;
pub use time_provider::{SystemTimeProvider, TimeProvider};
