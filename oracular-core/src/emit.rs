//! Classification fact file output
//!
//! Format: `<method>\t<label>` per line, labels `context-insensitive` and
//! `2-object`, lines in assignment order.
//!
//! Global invariants enforced:
//! - Byte-for-byte identical output across runs over identical inputs
//! - Either the complete file is in place or the previous file is untouched

use crate::classify::Classification;
use crate::error::{ClassifyError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Render the classification as fact file text
pub fn render(classification: &Classification) -> String {
    let mut out = String::new();
    for (method, class) in classification.iter() {
        out.push_str(method);
        out.push('\t');
        out.push_str(class.label());
        out.push('\n');
    }
    out
}

/// Write the classification to `path`, creating parent directories and
/// replacing any existing file
pub fn write(path: &Path, classification: &Classification) -> Result<()> {
    atomic_write(path, &render(classification))?;
    tracing::debug!(
        "wrote {} classifications to {}",
        classification.len(),
        path.display()
    );
    Ok(())
}

/// Write through a uniquely named temp file in the target directory and
/// persist it over `path`
///
/// No other file in the directory is touched, whatever its name.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    use std::fs;

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| ClassifyError::io(parent, e))?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| ClassifyError::io(parent, e))?;
    temp.write_all(contents.as_bytes())
        .map_err(|e| ClassifyError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ClassifyError::io(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| ClassifyError::io(path, e.error))?;

    Ok(())
}
