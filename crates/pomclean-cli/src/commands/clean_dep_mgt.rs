//! Handler for `pomclean clean-dep-mgt`.

use std::path::Path;

use miette::Result;

use pomclean_core::config::CleanConfig;
use pomclean_ops::ops_clean_dep_mgt::{run_clean_dep_mgt, ManagementMode};
use pomclean_util::progress::{status, status_info, status_warn};

pub fn exec(pom_path: &Path, config: &CleanConfig) -> Result<()> {
    let report = run_clean_dep_mgt(pom_path, config)?;

    if report.mode == ManagementMode::Unsupported {
        status_info(
            "Skipping",
            "project structure not supported for dependency management cleanup",
        );
        return Ok(());
    }
    for name in &report.unhosted {
        status_warn("Unmanaged", &format!("{name} has no parent with dependency management"));
    }
    if report.hosts.is_empty() {
        status_info("Skipping", "no project declares dependency management");
        return Ok(());
    }

    for host in &report.hosts {
        if config.verbose {
            status_info("Members", &format!("{}: {}", host.host, host.members.join(", ")));
            for key in &host.removed {
                status("Removed", &key.to_string());
            }
        }
        status(
            "Cleaned",
            &format!(
                "{}: {} -> {} managed dependencies",
                host.host, host.original, host.final_count
            ),
        );
        match host.error {
            Some(ref e) => status_warn(
                "Warning",
                &format!("could not write {}: {e}", host.output.display()),
            ),
            None => status_info("Wrote", &host.output.display().to_string()),
        }
    }
    Ok(())
}
