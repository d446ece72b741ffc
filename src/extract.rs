//! Archive extraction for downloaded patches.
//!
//! Format is chosen by file extension; the transfer layer treats the body
//! as opaque bytes, so the URL's extension is the only signal available.
//! Patch releases ship as zip; tarballs are handled because GitHub archive
//! endpoints offer both.

use crate::error::{AtelierError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

/// Unpack `src` into the directory `dest`.
pub fn extract_archive(src: &Path, dest: &Path) -> Result<()> {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    tracing::debug!(archive = %src.display(), dest = %dest.display(), "extracting");

    if name.ends_with(".zip") {
        let file = File::open(src).map_err(|e| extraction_failed(src, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| extraction_failed(src, e))?;
        archive
            .extract(dest)
            .map_err(|e| extraction_failed(src, e))?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = File::open(src).map_err(|e| extraction_failed(src, e))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .unpack(dest)
            .map_err(|e| extraction_failed(src, e))?;
    } else {
        return Err(AtelierError::ExtractionFailed {
            path: src.to_path_buf(),
            message: format!("unsupported archive type: {}", name),
        });
    }

    Ok(())
}

fn extraction_failed(src: &Path, cause: impl std::fmt::Display) -> AtelierError {
    AtelierError::ExtractionFailed {
        path: src.to_path_buf(),
        message: cause.to_string(),
    }
}

/// Find the archive's top-level directory by name prefix.
///
/// GitHub archives wrap their contents in `<project>-<ref>/`; the ref part
/// drifts across releases, so the catalog stores only the stable prefix.
pub fn find_extracted_root(dest: &Path, prefix: &str) -> Result<std::path::PathBuf> {
    let entries = std::fs::read_dir(dest).map_err(|e| extraction_failed(dest, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| extraction_failed(dest, e))?;
        let path = entry.path();
        if path.is_dir()
            && entry
                .file_name()
                .to_string_lossy()
                .starts_with(prefix)
        {
            return Ok(path);
        }
    }

    Err(AtelierError::ExtractionFailed {
        path: dest.to_path_buf(),
        message: format!("no extracted directory matching '{}*'", prefix),
    })
}
