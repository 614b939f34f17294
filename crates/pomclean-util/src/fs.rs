use std::io::Write;
use std::path::{Path, PathBuf};

/// The nearest of `start` and its ancestors that directly contains a file
/// named `file_name`.
pub fn nearest_dir_containing(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(file_name).is_file())
        .map(Path::to_path_buf)
}

/// Create `dir` and any missing parents. An existing directory is fine.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Replace the contents of `path`, creating the file if needed. The parent
/// directory must exist.
pub fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents)?;
    file.flush()
}
