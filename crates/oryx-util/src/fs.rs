use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Read a file to string, mapping "file does not exist" to `None`.
///
/// Used for loading optional state (cache snapshots, previously generated
/// output) where absence means "start empty".
///
/// # Errors
/// Returns an error for any read failure other than `NotFound`.
pub fn read_to_string_opt(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never
/// a partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Temp file must live in the same directory so the rename stays on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if the target exists. Copy + remove as fallback.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Write `contents` to `path` only if it differs from what is already there.
///
/// Returns `true` if the file was written, `false` if the existing content
/// matched and the file (including its modification time) was left alone.
/// Generated build files go through this so an unchanged manifest never
/// invalidates a downstream build cache.
///
/// # Errors
/// Returns an error if the existing file cannot be read (other than not
/// existing) or the write fails.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
    if let Some(existing) = read_to_string_opt(path)? {
        if existing == contents {
            return Ok(false);
        }
    }
    atomic_write(path, contents.as_bytes())?;
    Ok(true)
}
