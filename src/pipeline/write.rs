//! Output writing: encoded page → `<dir>/page_<n>.png`, atomically.
//!
//! Bytes are written to a temporary file in the destination directory and then
//! renamed onto the final path, so a reader never observes a half-written
//! image even if the process dies mid-write. The temp file lives in the same
//! directory so the rename never crosses a filesystem.

use crate::error::PageError;
use crate::pipeline::encode::EncodedImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deterministic output path for the page at 0-based `page_index`.
pub fn output_path(output_dir: &Path, page_index: usize) -> PathBuf {
    output_dir.join(format!("page_{}.png", page_index + 1))
}

/// Persist `image` at `path`, replacing any existing file.
///
/// Consumes the image: its bytes are dropped once written. `page` is the
/// 1-indexed page number used in error reports.
///
/// # Errors
/// [`PageError::IoFailure`] on any storage error. The temp file is removed.
pub fn write_image(image: EncodedImage, path: &Path, page: usize) -> Result<PathBuf, PageError> {
    let fail = |detail: String| PageError::IoFailure {
        page,
        path: path.to_path_buf(),
        detail,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".splitpdf-")
        .suffix(&format!(".{}.tmp", image.format.extension()))
        .tempfile_in(dir)
        .map_err(|e| fail(format!("cannot create temp file: {e}")))?;

    tmp.write_all(&image.bytes)
        .map_err(|e| fail(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| fail(e.to_string()))?;

    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    debug!("Wrote {} bytes → {}", image.bytes.len(), path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedFormat;

    fn png(bytes: &[u8]) -> EncodedImage {
        EncodedImage {
            bytes: bytes.to_vec(),
            format: EncodedFormat::Png,
        }
    }

    #[test]
    fn output_names_are_one_based() {
        let dir = Path::new("/out");
        assert_eq!(output_path(dir, 0), PathBuf::from("/out/page_1.png"));
        assert_eq!(output_path(dir, 41), PathBuf::from("/out/page_42.png"));
    }

    #[test]
    fn writes_bytes_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = output_path(dir.path(), 0);
        let written = write_image(png(b"hello"), &path, 1).expect("write");
        assert_eq!(written, path);
        assert_eq!(std::fs::read(&path).expect("read"), b"hello");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("page_1.png")]);
    }

    #[test]
    fn overwrites_existing_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = output_path(dir.path(), 2);
        std::fs::write(&path, b"stale").expect("seed");
        write_image(png(b"fresh"), &path, 3).expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), b"fresh");
    }

    #[test]
    fn missing_directory_is_io_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = output_path(&dir.path().join("does-not-exist"), 0);
        let err = write_image(png(b"x"), &path, 1).expect_err("no dir");
        match err {
            PageError::IoFailure { page, path: p, .. } => {
                assert_eq!(page, 1);
                assert_eq!(p, path);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!path.exists());
    }
}
