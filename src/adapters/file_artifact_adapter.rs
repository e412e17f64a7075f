//! Filesystem artifact adapter.
//!
//! Writes go to a temporary file in the artifact's directory which is then
//! renamed over the original, so the artifact is either fully replaced or
//! left as it was.

use crate::domain::error::PendtagError;
use crate::ports::artifact_port::ArtifactPort;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct FileArtifactAdapter {
    path: PathBuf,
}

impl FileArtifactAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_failure(&self, reason: impl ToString) -> PendtagError {
        PendtagError::WriteFailure {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ArtifactPort for FileArtifactAdapter {
    fn read(&self) -> Result<String, PendtagError> {
        fs::read_to_string(&self.path).map_err(|e| {
            PendtagError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {}", self.path.display(), e),
            ))
        })
    }

    fn write(&self, content: &str) -> Result<(), PendtagError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_failure(e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| self.write_failure(e))?;
        if let Ok(meta) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| self.write_failure(e))?;
        }
        tmp.persist(&self.path).map_err(|e| self.write_failure(e.error))?;
        tracing::debug!(path = %self.path.display(), bytes = content.len(), "artifact written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
