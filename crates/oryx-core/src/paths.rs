use std::path::{Path, PathBuf};

/// Find the repository root by walking up from `cwd`.
///
/// The root is the first directory containing either a `.git` directory or
/// a previously generated `WORKSPACE` file. Returns `None` if neither
/// marker is found on the way up.
#[must_use]
pub fn repo_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join(".git").exists() || current.join("WORKSPACE").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}
