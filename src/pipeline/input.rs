//! Input resolution: read user-supplied Markdown files into
//! [`SourceDocument`]s.
//!
//! Files are read as raw bytes; decoding happens later, per document, so a
//! single file with a bad encoding fails only its own batch item instead of
//! the whole run.

use crate::error::Md2PdfError;
use crate::output::SourceDocument;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read every path, preserving order.
///
/// # Errors
/// Fails on the first path that does not exist or cannot be read; nothing
/// has been rendered at this point, so there is nothing to isolate.
pub async fn load_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceDocument>, Md2PdfError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(load_source(path.as_ref()).await?);
    }
    Ok(sources)
}

/// Read one Markdown file.
pub async fn load_source(path: &Path) -> Result<SourceDocument, Md2PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Md2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Md2PdfError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = display_file_name(path);
    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceDocument::new(name, bytes))
}

/// The final path component, or the whole path when there is none.
fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}
