//! Input resolution: validate the user-supplied path before anything else.
//!
//! Checks run before the document is opened and before the output directory
//! is created, so a typo in the input path never leaves an empty output
//! directory behind. We validate the PDF magic bytes (`%PDF`) so callers get a
//! meaningful error rather than a backend crash.

use crate::error::SplitError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local source file of any format, validating existence and
/// readability.
pub fn resolve_source(path: &Path) -> Result<PathBuf, SplitError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(SplitError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {
            debug!("Resolved source: {}", path.display());
            Ok(path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(SplitError::PermissionDenied { path })
        }
        Err(_) => Err(SplitError::FileNotFound { path }),
    }
}

/// Resolve a local PDF path: [`resolve_source`] plus a check of the PDF
/// magic bytes.
pub fn resolve_input(path: &Path) -> Result<PathBuf, SplitError> {
    let path = resolve_source(path)?;

    // Files shorter than the magic are compared zero-padded, so they fail too.
    let mut head = Vec::with_capacity(4);
    std::fs::File::open(&path)
        .and_then(|f| f.take(4).read_to_end(&mut head))
        .map_err(|e| SplitError::Decode {
            path: path.clone(),
            detail: format!("cannot read header: {e}"),
        })?;
    let mut magic = [0u8; 4];
    magic[..head.len()].copy_from_slice(&head);
    if &magic != b"%PDF" {
        return Err(SplitError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Create `dir` (and parents) if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), SplitError> {
    std::fs::create_dir_all(dir).map_err(|source| SplitError::OutputDirCreateFailed {
        path: dir.to_path_buf(),
        source,
    })
}
