//! Operation: remove unused and add used-but-undeclared dependencies of a
//! single project, writing the result to a clean POM.

use std::path::{Path, PathBuf};

use pomclean_core::config::CleanConfig;
use pomclean_core::dependency::DependencyKey;
use pomclean_maven::analysis::{oracle_for, Artifact, UsageOracle};
use pomclean_maven::pom::sort_by_signature;
use pomclean_maven::project::{Project, ProjectTree};
use pomclean_util::errors::{PomcleanError, PomcleanResult};

use crate::reconcile::{apply_edit, reconcile};

/// Options for `pomclean clean-dep`.
#[derive(Debug, Clone)]
pub struct CleanDepOptions {
    /// Where to write the clean POM. Defaults to the build directory.
    pub output_directory: Option<PathBuf>,
    pub output_file_name: String,
    /// Keep unused dependencies whose scope is not `compile`.
    pub ignore_non_compile: bool,
}

impl CleanDepOptions {
    pub fn from_config(config: &CleanConfig) -> Self {
        Self {
            output_directory: config.output_directory.clone(),
            output_file_name: config.output_file_name.clone(),
            ignore_non_compile: config.ignore_non_compile,
        }
    }
}

/// Result of cleaning one project's dependencies.
#[derive(Debug)]
pub enum CleanDepOutcome {
    /// Aggregator POMs have no code to analyze.
    SkippedPomPackaging,
    /// The output directory does not exist, usually because the project
    /// has not been built.
    SkippedNoBuildDirectory(PathBuf),
    Cleaned(CleanDepReport),
}

#[derive(Debug)]
pub struct CleanDepReport {
    pub project: String,
    pub original: usize,
    pub removed: Vec<DependencyKey>,
    pub added: Vec<DependencyKey>,
    /// Unused dependencies left declared because of their scope.
    pub kept_by_policy: Vec<Artifact>,
    pub final_count: usize,
    pub output: PathBuf,
    /// Set when the clean POM could not be written.
    pub write_error: Option<String>,
}

impl CleanDepReport {
    pub fn has_warnings(&self) -> bool {
        self.write_error.is_some()
    }
}

/// Clean the declared dependencies of `project` using `oracle`.
///
/// An analysis failure is returned as an error before anything is written.
/// A failure to write the clean POM is recorded on the report instead.
pub fn clean_dependencies(
    project: &mut Project,
    oracle: &dyn UsageOracle,
    opts: &CleanDepOptions,
) -> PomcleanResult<CleanDepOutcome> {
    if project.pom.is_pom_packaging() {
        tracing::info!("Skipping pom project {}", project.display_name());
        return Ok(CleanDepOutcome::SkippedPomPackaging);
    }

    let output_dir = opts
        .output_directory
        .clone()
        .unwrap_or_else(|| project.build_directory());
    if !output_dir.is_dir() {
        tracing::info!(
            "Skipping project with no build directory: {}",
            output_dir.display()
        );
        return Ok(CleanDepOutcome::SkippedNoBuildDirectory(output_dir));
    }

    let analysis = oracle.analyze(project)?;
    let edit = reconcile(&analysis, opts.ignore_non_compile);
    for artifact in &edit.kept_by_policy {
        tracing::info!(
            "Keeping unused {} dependency {}",
            artifact.scope,
            artifact.key()
        );
    }

    let applied = apply_edit(&mut project.pom, &edit);
    sort_by_signature(&mut project.pom.dependencies);
    tracing::info!(
        "Reduced dependencies of {} from {} to {} ({} removed, {} added)",
        project.display_name(),
        applied.original,
        applied.final_count,
        applied.removed.len(),
        applied.added.len()
    );

    let output = output_dir.join(&opts.output_file_name);
    let write_error = match crate::write_clean_pom(project, &output_dir, &opts.output_file_name) {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to write {}: {e}", output.display());
            Some(e.to_string())
        }
    };

    Ok(CleanDepOutcome::Cleaned(CleanDepReport {
        project: project.display_name(),
        original: applied.original,
        removed: applied.removed,
        added: applied.added,
        kept_by_policy: edit.kept_by_policy,
        final_count: applied.final_count,
        output,
        write_error,
    }))
}

/// Load the project at `pom_path` and clean it as configured.
///
/// With `fail-on-warning` a write failure becomes an error.
pub fn run_clean_dep(pom_path: &Path, config: &CleanConfig) -> PomcleanResult<CleanDepOutcome> {
    let mut tree = ProjectTree::load_project(pom_path)?;
    let root = tree.root();
    let oracle = oracle_for(&config.analysis);
    let outcome = clean_dependencies(
        tree.get_mut(root),
        oracle.as_ref(),
        &CleanDepOptions::from_config(config),
    )?;

    if let CleanDepOutcome::Cleaned(ref report) = outcome {
        if report.has_warnings() {
            if config.fail_on_warning {
                return Err(PomcleanError::DependencyProblems {
                    message: "Dependency problems found".to_string(),
                }
                .into());
            }
            tracing::warn!("Dependency problems found");
        }
    }
    Ok(outcome)
}
