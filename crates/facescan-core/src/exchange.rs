//! Short-lived files used to pass byte payloads across the engine boundary.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A temp file holding one payload, deleted when dropped.
///
/// Deletion failures are logged and swallowed: by the time the file is
/// dropped the operation's result is already decided.
#[derive(Debug)]
pub struct TempExchangeFile {
    path: Option<TempPath>,
}

impl TempExchangeFile {
    /// Write `bytes` to a fresh file named `<prefix>XXXXXX<suffix>` inside `dir`.
    ///
    /// On a write failure the partially written file is removed before the
    /// error is returned.
    pub fn write_in(dir: &Path, prefix: &str, suffix: &str, bytes: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        tracing::trace!(path = %path.display(), len = bytes.len(), "exchange file written");
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        // Only `Drop` takes the path out.
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.path().to_path_buf()
    }
}

impl Drop for TempExchangeFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            if let Err(err) = path.close() {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %shown, error = %err, "failed to delete exchange file");
                }
            }
        }
    }
}
