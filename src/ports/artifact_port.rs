//! Artifact access port trait.

use crate::domain::error::PendtagError;

/// Whole-text access to one artifact. Writes replace the artifact in a single
/// step: a failed write leaves the previous content in place.
pub trait ArtifactPort {
    fn read(&self) -> Result<String, PendtagError>;

    fn write(&self, content: &str) -> Result<(), PendtagError>;

    /// Human-readable location for diagnostics.
    fn location(&self) -> String;
}
