//! Gates - boolean predicates over environment facts
//!
//! A gate decides whether a scenario (or a whole block of scenarios) runs.
//! Gates are plain data so matrix files can express them, and evaluation is
//! a pure function of [`EnvironmentFacts`].

use serde::{Deserialize, Serialize};

use super::facts::{EnvironmentFacts, Implementation, PythonVersion, ReleaseLevel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gate {
    Always,
    VersionEquals { major: u32, minor: u32 },
    VersionAtLeast { major: u32, minor: u32 },
    Implementation { is: Implementation },
    ReleaseLevel { is: ReleaseLevel },
    All { of: Vec<Gate> },
    Any { of: Vec<Gate> },
    Not { gate: Box<Gate> },
}

impl Gate {
    pub fn version_equals(major: u32, minor: u32) -> Self {
        Gate::VersionEquals { major, minor }
    }

    pub fn version_at_least(major: u32, minor: u32) -> Self {
        Gate::VersionAtLeast { major, minor }
    }

    pub fn implementation(is: Implementation) -> Self {
        Gate::Implementation { is }
    }

    pub fn release_level(is: ReleaseLevel) -> Self {
        Gate::ReleaseLevel { is }
    }

    pub fn all(of: impl IntoIterator<Item = Gate>) -> Self {
        Gate::All {
            of: of.into_iter().collect(),
        }
    }

    pub fn any(of: impl IntoIterator<Item = Gate>) -> Self {
        Gate::Any {
            of: of.into_iter().collect(),
        }
    }

    pub fn negate(gate: Gate) -> Self {
        Gate::Not {
            gate: Box::new(gate),
        }
    }

    /// Release level is final AND the interpreter is the reference implementation
    pub fn final_reference() -> Self {
        Gate::all([
            Gate::release_level(ReleaseLevel::Final),
            Gate::implementation(Implementation::Reference),
        ])
    }

    /// Evaluate against a facts snapshot. Pure and total.
    ///
    /// An empty `all` is true and an empty `any` is false.
    pub fn evaluate(&self, facts: &EnvironmentFacts) -> bool {
        match self {
            Gate::Always => true,
            Gate::VersionEquals { major, minor } => {
                facts.version == PythonVersion::new(*major, *minor)
            }
            Gate::VersionAtLeast { major, minor } => {
                facts.version >= PythonVersion::new(*major, *minor)
            }
            Gate::Implementation { is } => facts.implementation == *is,
            Gate::ReleaseLevel { is } => facts.release_level == *is,
            Gate::All { of } => of.iter().all(|gate| gate.evaluate(facts)),
            Gate::Any { of } => of.iter().any(|gate| gate.evaluate(facts)),
            Gate::Not { gate } => !gate.evaluate(facts),
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Always => write!(f, "always"),
            Gate::VersionEquals { major, minor } => write!(f, "version == {major}.{minor}"),
            Gate::VersionAtLeast { major, minor } => write!(f, "version >= {major}.{minor}"),
            Gate::Implementation { is } => write!(f, "implementation == {is}"),
            Gate::ReleaseLevel { is } => write!(f, "release == {is}"),
            Gate::All { of } => write_joined(f, of, " && "),
            Gate::Any { of } => write_joined(f, of, " || "),
            Gate::Not { gate } => write!(f, "!({gate})"),
        }
    }
}

fn write_joined(f: &mut std::fmt::Formatter<'_>, gates: &[Gate], sep: &str) -> std::fmt::Result {
    write!(f, "(")?;
    for (idx, gate) in gates.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{gate}")?;
    }
    write!(f, ")")
}
