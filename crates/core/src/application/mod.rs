// Application Layer - Use Cases

pub mod catalog;
pub mod orchestrator;
pub mod plan;

// Re-exports
pub use catalog::{default_matrix, load_matrix, parse_matrix};
pub use orchestrator::Orchestrator;
pub use plan::{plan_entries, PlanEntry, Verdict};
