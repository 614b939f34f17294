pub mod hosts;
pub mod ops_clean_dep;
pub mod ops_clean_dep_mgt;
pub mod reconcile;

use std::path::{Path, PathBuf};

use pomclean_maven::project::Project;
use pomclean_util::errors::{PomcleanError, PomcleanResult};

/// Render the project's current model into its original document and write
/// it to `dir/file_name`. Returns the written path.
pub fn write_clean_pom(project: &Project, dir: &Path, file_name: &str) -> PomcleanResult<PathBuf> {
    let rendered = project.render()?;
    let path = dir.join(file_name);
    pomclean_util::fs::write_file(&path, rendered.as_bytes()).map_err(PomcleanError::Io)?;
    tracing::info!("Wrote {}", path.display());
    Ok(path)
}
