//! Layered runner settings
//!
//! Precedence, lowest first: built-in defaults, the user config file,
//! `--config FILE`, `TESTMATRIX_*` environment variables, CLI flags.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use testmatrix_infra_system::PythonToolchain;

pub const ENV_PREFIX: &str = "TESTMATRIX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub python: String,
    pub working_dir: String,
    pub log_format: LogFormat,
    #[serde(default)]
    pub pytest_args: Vec<String>,
}

/// Values given on the command line (highest precedence)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub python: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub pytest_args: Vec<String>,
}

impl Settings {
    /// Load settings from every layer
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let user_file = ProjectDirs::from("", "", "testmatrix")
            .map(|dirs| dirs.config_dir().join("config"));
        Self::load_from(user_file.as_deref(), config_file, overrides)
    }

    fn load_from(
        user_file: Option<&Path>,
        config_file: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("python", "python")?
            .set_default("working_dir", ".")?
            .set_default("log_format", "pretty")?
            .set_default("pytest_args", Vec::<String>::new())?;

        if let Some(path) = user_file {
            builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
        }
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("pytest_args"),
            )
            .build()
            .context("Failed to load settings")?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Invalid settings")?;
        settings.apply(overrides);
        Ok(settings)
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(python) = &overrides.python {
            self.python = python.clone();
        }
        if let Some(dir) = &overrides.working_dir {
            self.working_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if !overrides.pytest_args.is_empty() {
            self.pytest_args = overrides.pytest_args.clone();
        }
    }

    pub fn toolchain(&self) -> PythonToolchain {
        PythonToolchain {
            python: shellexpand::tilde(&self.python).into_owned(),
            working_dir: PathBuf::from(shellexpand::tilde(&self.working_dir).into_owned()),
        }
    }
}
