use std::path::{Path, PathBuf};

use crate::errors::ArbiterError;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Read a UTF-8 file, mapping failures to [`ArbiterError::Io`] with the path
/// folded into the message.
pub fn read_to_string(path: &Path) -> Result<String, ArbiterError> {
    tracing::trace!("reading {}", path.display());
    std::fs::read_to_string(path).map_err(|e| {
        ArbiterError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })
}
