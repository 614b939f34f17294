//! Dependency usage analysis results and where they come from.
//!
//! pomclean does not scan bytecode itself. A [`UsageOracle`] supplies the
//! used-undeclared and unused-declared artifacts of a project, either from a
//! saved report ([`ReportOracle`]) or by running an analyzer
//! ([`CommandOracle`], `mvn dependency:analyze` by default).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pomclean_core::config::AnalysisConfig;
use pomclean_core::dependency::{DependencyKey, DependencyScope};
use pomclean_util::errors::{PomcleanError, PomcleanResult};
use pomclean_util::process::ExternalCommand;

use crate::project::Project;

/// Report file looked up in the build directory when none is configured.
pub const DEFAULT_REPORT_FILE: &str = "dependency-analysis.json";

/// Analyzer run by [`CommandOracle`] when none is configured.
pub const DEFAULT_ANALYZE_COMMAND: &str = "mvn -B dependency:analyze";

/// A resolved artifact as reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scope: DependencyScope,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl Artifact {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            scope: DependencyScope::Compile,
            type_: None,
            classifier: None,
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.group_id, &self.artifact_id)
    }

    /// Parse `group:artifact:type:version:scope` or
    /// `group:artifact:type:classifier:version:scope`.
    pub fn parse_coordinate(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let (type_, classifier, version, scope) = match parts.as_slice() {
            [_, _, t, v, s] => (*t, None, *v, *s),
            [_, _, t, c, v, s] => (*t, Some(*c), *v, *s),
            _ => return None,
        };
        if parts[0].is_empty() || parts[1].is_empty() {
            return None;
        }
        Some(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: Some(version.to_string()),
            scope: DependencyScope::parse(scope)?,
            type_: Some(type_.to_string()),
            classifier: classifier.map(str::to_string),
        })
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(ref version) = self.version {
            write!(f, ":{version}")?;
        }
        write!(f, ":{}", self.scope)
    }
}

/// Outcome of analyzing one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAnalysis {
    #[serde(default)]
    pub used_undeclared: Vec<Artifact>,
    #[serde(default)]
    pub unused_declared: Vec<Artifact>,
}

#[derive(Clone, Copy)]
enum LogSection {
    UsedUndeclared,
    UnusedDeclared,
    Other,
}

impl UsageAnalysis {
    pub fn from_json(text: &str) -> PomcleanResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            PomcleanError::Analysis {
                message: format!("Invalid analysis report: {e}"),
            }
            .into()
        })
    }

    /// Parse the console output of `mvn dependency:analyze`.
    ///
    /// Lines look like `[WARNING]    g:a:jar:1.0:compile` and are grouped
    /// under "Used undeclared dependencies found:" and "Unused declared
    /// dependencies found:" headings. Other headings and lines are skipped.
    pub fn from_analyze_log(text: &str) -> Self {
        let mut analysis = Self::default();
        let mut section = LogSection::Other;
        for line in text.lines() {
            let content = strip_log_level(line).trim();
            if content.is_empty() {
                continue;
            }
            let lower = content.to_ascii_lowercase();
            if lower.starts_with("used undeclared dependencies") {
                section = LogSection::UsedUndeclared;
                continue;
            }
            if lower.starts_with("unused declared dependencies") {
                section = LogSection::UnusedDeclared;
                continue;
            }
            let token = content.split_whitespace().next().unwrap_or_default();
            match (section, Artifact::parse_coordinate(token)) {
                (LogSection::UsedUndeclared, Some(artifact)) => {
                    analysis.used_undeclared.push(artifact)
                }
                (LogSection::UnusedDeclared, Some(artifact)) => {
                    analysis.unused_declared.push(artifact)
                }
                (_, Some(_)) => {}
                // Per-class detail lines follow an artifact; any other
                // heading ends the current list.
                (_, None) if content.ends_with(':') => section = LogSection::Other,
                (_, None) => {}
            }
        }
        analysis
    }

    /// Parse a report that is either JSON or a saved analyzer log.
    pub fn parse_report(text: &str) -> PomcleanResult<Self> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Ok(Self::from_analyze_log(text))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.used_undeclared.is_empty() && self.unused_declared.is_empty()
    }
}

fn strip_log_level(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
        Some((level, rest)) if level.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => trimmed,
    }
}

/// Source of dependency usage data for a project.
pub trait UsageOracle {
    /// Analyze `project`. An error means usage data is unavailable and the
    /// cleanup cannot proceed.
    fn analyze(&self, project: &Project) -> PomcleanResult<UsageAnalysis>;
}

/// Reads a previously written analysis report.
#[derive(Debug, Clone, Default)]
pub struct ReportOracle {
    path: Option<PathBuf>,
}

impl ReportOracle {
    /// `path` of `None` means `<build dir>/dependency-analysis.json`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn report_path(&self, project: &Project) -> PathBuf {
        match self.path {
            Some(ref path) => path.clone(),
            None => project.build_directory().join(DEFAULT_REPORT_FILE),
        }
    }
}

impl UsageOracle for ReportOracle {
    fn analyze(&self, project: &Project) -> PomcleanResult<UsageAnalysis> {
        let path = self.report_path(project);
        tracing::info!("Reading dependency analysis from {}", path.display());
        let text = read_report(&path)?;
        UsageAnalysis::parse_report(&text)
    }
}

fn read_report(path: &Path) -> PomcleanResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PomcleanError::Analysis {
            message: format!("Failed to read {}: {e}", path.display()),
        }
        .into()
    })
}

/// Runs an analyzer in the project directory and parses its output.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: String,
}

impl CommandOracle {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for CommandOracle {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYZE_COMMAND)
    }
}

impl UsageOracle for CommandOracle {
    fn analyze(&self, project: &Project) -> PomcleanResult<UsageAnalysis> {
        let command = ExternalCommand::parse(&self.command)
            .ok_or_else(|| PomcleanError::Config {
                message: "Analyzer command is empty".to_string(),
            })?
            .in_dir(project.basedir());
        tracing::info!("Running `{command}` in {}", project.basedir().display());

        let output = command.run().map_err(|e| PomcleanError::Analysis {
            message: format!("Failed to run `{command}`: {e}"),
        })?;
        if !output.status.success() {
            return Err(PomcleanError::Analysis {
                message: format!(
                    "`{command}` exited with {}\n{}",
                    output.status,
                    output.stdout_tail(10)
                ),
            }
            .into());
        }
        Ok(UsageAnalysis::from_analyze_log(&output.stdout))
    }
}

/// Pick the oracle described by `[analysis]`: a command if one is
/// configured, otherwise a report file.
pub fn oracle_for(config: &AnalysisConfig) -> Box<dyn UsageOracle> {
    match config.command {
        Some(ref command) => Box::new(CommandOracle::new(command.clone())),
        None => Box::new(ReportOracle::new(config.report.clone())),
    }
}
