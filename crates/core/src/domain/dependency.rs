// Dependency sets installed and removed around a scenario

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// A single package identifier, optionally pinned to an exact version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Requirement string handed to the package manager (`name==version` when pinned)
    pub fn requirement(&self) -> String {
        match &self.version {
            Some(version) => format!("{}=={}", self.name, version),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.requirement())
    }
}

/// Named, ordered list of packages
///
/// The same type serves as an install set and as a removal set; a scenario's
/// removal set may name packages the install pulled in transitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySet {
    pub name: String,
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl DependencySet {
    pub fn new(name: impl Into<String>, packages: Vec<Package>) -> Self {
        Self {
            name: name.into(),
            packages,
        }
    }

    /// Set with no packages (install and removal become no-ops)
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Build a set of unpinned packages
    pub fn of<I, S>(name: impl Into<String>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, packages.into_iter().map(Package::new).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn requirements(&self) -> Vec<String> {
        self.packages.iter().map(Package::requirement).collect()
    }

    /// Bare package names (removal ignores pins)
    pub fn names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "dependency set name cannot be empty".to_string(),
            ));
        }
        for (idx, package) in self.packages.iter().enumerate() {
            if package.name.trim().is_empty() {
                return Err(DomainError::ValidationError(format!(
                    "{}: packages[{idx}] has an empty name",
                    self.name
                )));
            }
            if package.name.chars().any(|c| c.is_whitespace() || c == '\0') {
                return Err(DomainError::ValidationError(format!(
                    "{}: package name '{}' contains whitespace or NUL",
                    self.name, package.name
                )));
            }
            if let Some(version) = &package.version {
                if version.trim().is_empty() || version.chars().any(char::is_whitespace) {
                    return Err(DomainError::ValidationError(format!(
                        "{}: package '{}' has an invalid version pin",
                        self.name, package.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for DependencySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.packages.is_empty() {
            return write!(f, "{} (empty)", self.name);
        }
        write!(f, "{} [{}]", self.name, self.requirements().join(", "))
    }
}
