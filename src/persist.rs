//! Whole-file persistence helpers.

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `contents` without ever leaving a half-written file.
///
/// The data goes to a temporary file in the same directory which is then renamed
/// over the target.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
