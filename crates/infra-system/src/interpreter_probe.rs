// Interpreter probe implementation
// reason: asks the interpreter itself, nothing is inferred from PATH or names
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use testmatrix_core::domain::{
    ConfigurationError, EnvOverlay, EnvironmentFacts, Implementation, PythonVersion, ReleaseLevel,
};
use testmatrix_core::port::{EnvironmentProbe, TimeProvider};

use crate::subprocess::{tail, OutputMode, PythonToolchain, SubprocessRunner, MAX_REASON_BYTES};

/// Prints `<major> <minor> <implementation> <releaselevel>` on one line
pub const PROBE_SCRIPT: &str = "import platform, sys; \
print(sys.version_info[0], sys.version_info[1], platform.python_implementation(), sys.version_info.releaselevel)";

/// EnvironmentProbe that queries the configured interpreter
pub struct InterpreterProbe {
    runner: SubprocessRunner,
}

impl InterpreterProbe {
    pub fn new(toolchain: PythonToolchain, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            runner: SubprocessRunner::new(toolchain, time_provider),
        }
    }
}

#[async_trait]
impl EnvironmentProbe for InterpreterProbe {
    async fn capture(&self) -> Result<EnvironmentFacts, ConfigurationError> {
        let args = vec!["-c".to_string(), PROBE_SCRIPT.to_string()];
        let outcome = self
            .runner
            .run_python(&args, &EnvOverlay::new(), OutputMode::Capture)
            .await
            .map_err(|e| {
                ConfigurationError::Probe(format!(
                    "failed to spawn {}: {e}",
                    self.runner.python()
                ))
            })?;

        if !outcome.success() {
            return Err(ConfigurationError::Probe(format!(
                "{} {}: {}",
                self.runner.python(),
                outcome.describe(),
                tail(&outcome.stderr, MAX_REASON_BYTES)
            )));
        }

        let facts = parse_probe_output(&outcome.stdout)?;
        debug!(facts = %facts, "Captured environment facts");
        Ok(facts)
    }
}

/// Parse the probe script's output
///
/// # Errors
/// - ConfigurationError::MissingFact when a field is absent or unrecognised
pub fn parse_probe_output(output: &str) -> Result<EnvironmentFacts, ConfigurationError> {
    let line = output
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| {
            ConfigurationError::MissingFact("interpreter facts (no output)".to_string())
        })?;

    let mut fields = line.split_whitespace();
    let major = parse_version_part(fields.next(), "major version")?;
    let minor = parse_version_part(fields.next(), "minor version")?;

    let implementation = fields
        .next()
        .and_then(Implementation::from_reported_name)
        .ok_or_else(|| ConfigurationError::MissingFact("interpreter implementation".to_string()))?;

    let release_level = match fields.next() {
        Some(level) => ReleaseLevel::from_reported_level(level).ok_or_else(|| {
            ConfigurationError::MissingFact(format!("release level (unrecognised '{level}')"))
        })?,
        None => {
            return Err(ConfigurationError::MissingFact(
                "release level".to_string(),
            ))
        }
    };

    Ok(EnvironmentFacts::new(
        PythonVersion::new(major, minor),
        implementation,
        release_level,
    ))
}

fn parse_version_part(field: Option<&str>, what: &str) -> Result<u32, ConfigurationError> {
    field
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ConfigurationError::MissingFact(what.to_string()))
}
