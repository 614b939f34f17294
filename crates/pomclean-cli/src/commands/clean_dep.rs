//! Handler for `pomclean clean-dep`.

use std::path::Path;

use miette::Result;

use pomclean_core::config::CleanConfig;
use pomclean_ops::ops_clean_dep::{run_clean_dep, CleanDepOutcome};
use pomclean_util::progress::{status, status_info, status_warn};

pub fn exec(pom_path: &Path, config: &CleanConfig) -> Result<()> {
    match run_clean_dep(pom_path, config)? {
        CleanDepOutcome::SkippedPomPackaging => status_info("Skipping", "pom project"),
        CleanDepOutcome::SkippedNoBuildDirectory(dir) => status_info(
            "Skipping",
            &format!("project with no build directory ({})", dir.display()),
        ),
        CleanDepOutcome::Cleaned(report) => {
            if config.verbose {
                for key in &report.removed {
                    status("Removed", &key.to_string());
                }
                for artifact in &report.kept_by_policy {
                    status_info(
                        "Kept",
                        &format!("{} ({} scope)", artifact.key(), artifact.scope),
                    );
                }
                for key in &report.added {
                    status("Added", &key.to_string());
                }
            }
            status(
                "Cleaned",
                &format!(
                    "{}: {} -> {} dependencies ({} removed, {} added)",
                    report.project,
                    report.original,
                    report.final_count,
                    report.removed.len(),
                    report.added.len()
                ),
            );
            match report.write_error {
                Some(ref e) => status_warn(
                    "Warning",
                    &format!("could not write {}: {e}", report.output.display()),
                ),
                None => status_info("Wrote", &report.output.display().to_string()),
            }
        }
    }
    Ok(())
}
