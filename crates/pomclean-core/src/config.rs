use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{CONFIG_FILE_NAME, DEFAULT_OUTPUT_FILE_NAME};

/// Tool configuration loaded from `pomclean.toml` next to the root POM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Directory the clean POM is written to. Defaults to the project's
    /// build directory.
    #[serde(default, rename = "output-directory")]
    pub output_directory: Option<PathBuf>,

    #[serde(default = "default_output_file_name", rename = "output-file-name")]
    pub output_file_name: String,

    /// Fail `clean-dep` when a warning was raised.
    #[serde(default = "default_fail_on_warning", rename = "fail-on-warning")]
    pub fail_on_warning: bool,

    /// Fail `clean-dep-mgt` when any host could not be cleaned.
    #[serde(default, rename = "fail-build")]
    pub fail_build: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Keep unused dependencies whose scope is not `compile`.
    #[serde(default, rename = "ignore-non-compile")]
    pub ignore_non_compile: bool,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            output_file_name: default_output_file_name(),
            fail_on_warning: default_fail_on_warning(),
            fail_build: false,
            verbose: false,
            ignore_non_compile: false,
            analysis: AnalysisConfig::default(),
        }
    }
}

fn default_output_file_name() -> String {
    DEFAULT_OUTPUT_FILE_NAME.to_string()
}

fn default_fail_on_warning() -> bool {
    true
}

/// Where dependency usage data comes from, from `[analysis]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Path to a JSON report or a saved `dependency:analyze` log.
    #[serde(default)]
    pub report: Option<PathBuf>,
    /// Analyzer command line to run in the project directory.
    #[serde(default)]
    pub command: Option<String>,
}

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_directory: Option<PathBuf>,
    pub output_file_name: Option<String>,
    pub fail_on_warning: Option<bool>,
    pub fail_build: Option<bool>,
    pub verbose: Option<bool>,
    pub ignore_non_compile: Option<bool>,
    pub report: Option<PathBuf>,
    pub analyze_command: Option<String>,
}

impl CleanConfig {
    /// Load `pomclean.toml` from `project_dir`, or return defaults if the file doesn't exist.
    ///
    /// Relative paths in the file are resolved against `project_dir`.
    pub fn load(project_dir: &Path) -> miette::Result<Self> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let mut config = Self::from_path(&path)?;
        config.resolve_paths(project_dir);
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration file without resolving relative paths.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            pomclean_util::errors::PomcleanError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            pomclean_util::errors::PomcleanError::Config {
                message: format!("Failed to parse {CONFIG_FILE_NAME}: {e}"),
            }
            .into()
        })
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(dir) = self.output_directory.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        if let Some(report) = self.analysis.report.as_mut() {
            if report.is_relative() {
                *report = base.join(&*report);
            }
        }
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.output_directory {
            self.output_directory = Some(dir);
        }
        if let Some(name) = overrides.output_file_name {
            self.output_file_name = name;
        }
        if let Some(v) = overrides.fail_on_warning {
            self.fail_on_warning = v;
        }
        if let Some(v) = overrides.fail_build {
            self.fail_build = v;
        }
        if let Some(v) = overrides.verbose {
            self.verbose = v;
        }
        if let Some(v) = overrides.ignore_non_compile {
            self.ignore_non_compile = v;
        }
        // A report given on the command line wins over a configured command.
        if let Some(report) = overrides.report {
            self.analysis.report = Some(report);
            self.analysis.command = None;
        }
        if let Some(cmd) = overrides.analyze_command {
            self.analysis.command = Some(cmd);
        }
    }
}
