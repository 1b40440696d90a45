// Environment facts consumed by gates

use serde::{Deserialize, Serialize};

/// Interpreter `(major, minor)` version tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Interpreter implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    /// The reference interpreter (CPython)
    Reference,
    /// Any other implementation (PyPy, ...)
    Alternate,
}

impl Implementation {
    /// Map an interpreter-reported implementation name.
    ///
    /// Returns `None` for an empty name: the probe must not guess.
    pub fn from_reported_name(name: &str) -> Option<Self> {
        match name.trim() {
            "" => None,
            "CPython" => Some(Implementation::Reference),
            _ => Some(Implementation::Alternate),
        }
    }
}

impl std::fmt::Display for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Implementation::Reference => write!(f, "reference"),
            Implementation::Alternate => write!(f, "alternate"),
        }
    }
}

/// Build release level of the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseLevel {
    Final,
    PreRelease,
}

impl ReleaseLevel {
    /// Map `sys.version_info.releaselevel`
    pub fn from_reported_level(level: &str) -> Option<Self> {
        match level.trim() {
            "final" => Some(ReleaseLevel::Final),
            "alpha" | "beta" | "candidate" => Some(ReleaseLevel::PreRelease),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReleaseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseLevel::Final => write!(f, "final"),
            ReleaseLevel::PreRelease => write!(f, "pre-release"),
        }
    }
}

/// Immutable snapshot of the execution environment, captured once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    pub version: PythonVersion,
    pub implementation: Implementation,
    pub release_level: ReleaseLevel,
}

impl EnvironmentFacts {
    pub fn new(
        version: PythonVersion,
        implementation: Implementation,
        release_level: ReleaseLevel,
    ) -> Self {
        Self {
            version,
            implementation,
            release_level,
        }
    }
}

impl std::fmt::Display for EnvironmentFacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.version, self.implementation, self.release_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implementation_mapping() {
        assert_eq!(
            Implementation::from_reported_name("CPython"),
            Some(Implementation::Reference)
        );
        assert_eq!(
            Implementation::from_reported_name("PyPy"),
            Some(Implementation::Alternate)
        );
        assert_eq!(Implementation::from_reported_name("  "), None);
    }

    #[test]
    fn test_release_level_mapping() {
        assert_eq!(
            ReleaseLevel::from_reported_level("final\n"),
            Some(ReleaseLevel::Final)
        );
        for level in ["alpha", "beta", "candidate"] {
            assert_eq!(
                ReleaseLevel::from_reported_level(level),
                Some(ReleaseLevel::PreRelease)
            );
        }
        assert_eq!(ReleaseLevel::from_reported_level("nightly"), None);
    }

    #[test]
    fn test_version_ordering_and_display() {
        assert!(PythonVersion::new(3, 9) > PythonVersion::new(3, 8));
        assert!(PythonVersion::new(3, 10) > PythonVersion::new(3, 9));

        let facts = EnvironmentFacts::new(
            PythonVersion::new(3, 8),
            Implementation::Reference,
            ReleaseLevel::Final,
        );
        assert_eq!(facts.to_string(), "3.8 reference final");
    }
}
