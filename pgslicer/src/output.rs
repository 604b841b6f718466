//! Writing the rendered dump.

use pgslicer_core::{Result, SlicerError};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Writes `dump` to `path`, or to stdout when no path is given.
///
/// # Errors
/// Returns [`SlicerError::Io`] when the destination cannot be written.
pub async fn write_dump(dump: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, dump)
            .await
            .map_err(|source| SlicerError::Io {
                context: format!("Failed to write to {}", path.display()),
                source,
            }),
        None => {
            let mut stdout = tokio::io::stdout();
            let written = match stdout.write_all(dump.as_bytes()).await {
                Ok(()) => stdout.flush().await,
                Err(e) => Err(e),
            };
            written.map_err(|source| SlicerError::Io {
                context: "Failed to write to stdout".to_string(),
                source,
            })
        }
    }
}
