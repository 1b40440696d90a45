// Scenario and matrix model (static, declarative configuration)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::dependency::DependencySet;
use super::error::{DomainError, Result};
use super::gate::Gate;
use super::run::ScenarioIndex;

/// Environment variables applied to a single test invocation
pub type EnvOverlay = BTreeMap<String, String>;

/// Which tests to run: a path plus an optional named selector and extra harness args
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTarget {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl TestTarget {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: None,
            args: Vec::new(),
        }
    }

    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl std::fmt::Display for TestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(select) = &self.select {
            write!(f, " -k {select}")?;
        }
        Ok(())
    }
}

/// One gated install/test/remove unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScenarioRecord")]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    pub install: DependencySet,
    pub target: TestTarget,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlay: EnvOverlay,
    pub remove: DependencySet,
}

/// Wire shape of a scenario; omitted sets are empty and named after the scenario
#[derive(Deserialize)]
struct ScenarioRecord {
    name: String,
    #[serde(default)]
    gate: Option<Gate>,
    #[serde(default)]
    install: Option<DependencySet>,
    target: TestTarget,
    #[serde(default)]
    overlay: EnvOverlay,
    #[serde(default)]
    remove: Option<DependencySet>,
}

impl From<ScenarioRecord> for Scenario {
    fn from(record: ScenarioRecord) -> Self {
        let mut scenario = Scenario::new(record.name, record.target);
        scenario.gate = record.gate;
        scenario.overlay = record.overlay;
        if let Some(set) = record.install {
            scenario.install = set;
        }
        if let Some(set) = record.remove {
            scenario.remove = set;
        }
        scenario
    }
}

impl Scenario {
    /// Scenario with no dependencies and no gate
    pub fn new(name: impl Into<String>, target: TestTarget) -> Self {
        let name = name.into();
        Self {
            install: DependencySet::empty(name.clone()),
            remove: DependencySet::empty(name.clone()),
            name,
            gate: None,
            target,
            overlay: EnvOverlay::new(),
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn installing(mut self, set: DependencySet) -> Self {
        self.install = set;
        self
    }

    pub fn removing(mut self, set: DependencySet) -> Self {
        self.remove = set;
        self
    }

    /// Install and remove the same set
    pub fn with_dependencies(self, set: DependencySet) -> Self {
        self.installing(set.clone()).removing(set)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overlay.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "scenario name cannot be empty".to_string(),
            ));
        }
        if self.target.path.trim().is_empty() {
            return Err(DomainError::ValidationError(format!(
                "{}: target path cannot be empty",
                self.name
            )));
        }
        for key in self.overlay.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(DomainError::ValidationError(format!(
                    "{}: invalid overlay variable name '{key}'",
                    self.name
                )));
            }
        }
        self.install.validate()?;
        self.remove.validate()
    }
}

/// A coarse gate wrapping a sub-sequence of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioBlock {
    pub name: String,
    pub gate: Gate,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixEntry {
    Scenario(Scenario),
    Block(ScenarioBlock),
}

/// The ordered scenario list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub entries: Vec<MatrixEntry>,
}

/// A scenario at its position in the run, with block and scenario gates combined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScenario {
    pub index: ScenarioIndex,
    pub block: Option<String>,
    pub gate: Option<Gate>,
    pub scenario: Scenario,
}

impl PlannedScenario {
    /// Ungated scenarios always run
    pub fn should_run(&self, facts: &super::EnvironmentFacts) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate.evaluate(facts))
    }
}

impl Matrix {
    pub fn new(entries: Vec<MatrixEntry>) -> Self {
        Self { entries }
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.entries.push(MatrixEntry::Scenario(scenario));
        self
    }

    pub fn block(mut self, name: impl Into<String>, gate: Gate, scenarios: Vec<Scenario>) -> Self {
        self.entries.push(MatrixEntry::Block(ScenarioBlock {
            name: name.into(),
            gate,
            scenarios,
        }));
        self
    }

    /// Check names are unique and every scenario is well-formed
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let scenarios = match entry {
                MatrixEntry::Scenario(scenario) => std::slice::from_ref(scenario),
                MatrixEntry::Block(block) => {
                    if block.name.trim().is_empty() {
                        return Err(DomainError::ValidationError(
                            "block name cannot be empty".to_string(),
                        ));
                    }
                    block.scenarios.as_slice()
                }
            };
            for scenario in scenarios {
                scenario.validate()?;
                if !seen.insert(scenario.name.as_str()) {
                    return Err(DomainError::ValidationError(format!(
                        "duplicate scenario name: {}",
                        scenario.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Flatten blocks into run order
    pub fn plan(&self) -> Vec<PlannedScenario> {
        let mut planned = Vec::new();
        for entry in &self.entries {
            match entry {
                MatrixEntry::Scenario(scenario) => planned.push(PlannedScenario {
                    index: ScenarioIndex::from_position(planned.len()),
                    block: None,
                    gate: scenario.gate.clone(),
                    scenario: scenario.clone(),
                }),
                MatrixEntry::Block(block) => {
                    for scenario in &block.scenarios {
                        let gate = match &scenario.gate {
                            Some(own) => Gate::all([block.gate.clone(), own.clone()]),
                            None => block.gate.clone(),
                        };
                        planned.push(PlannedScenario {
                            index: ScenarioIndex::from_position(planned.len()),
                            block: Some(block.name.clone()),
                            gate: Some(gate),
                            scenario: scenario.clone(),
                        });
                    }
                }
            }
        }
        planned
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                MatrixEntry::Scenario(_) => 1,
                MatrixEntry::Block(block) => block.scenarios.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
