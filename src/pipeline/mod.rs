/*!
 * Derivation pipeline: one bilingual source in, two candidate artifacts out.
 *
 * - `orchestrator`: runs the transform stages in dependency order
 * - `validator`: rejects empty final artifacts
 */

use std::fmt;
use std::path::{Path, PathBuf};

pub mod orchestrator;
pub mod validator;

pub use orchestrator::Pipeline;
pub use validator::{validate, validate_all};

/// The two artifacts a run derives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// English and Chinese merged (`.Eng&Chs.srt`)
    Merged,
    /// Chinese only, line-wrapped (`.Chs.srt`)
    Wrapped,
}

impl ArtifactKind {
    /// File name suffix appended to the source stem
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Merged => "Eng&Chs.srt",
            Self::Wrapped => "Chs.srt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged => f.write_str("merged"),
            Self::Wrapped => f.write_str("wrapped"),
        }
    }
}

/// The input subtitle file of a run
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    /// Path relative to the source tree
    pub relative_path: PathBuf,
    /// Raw file content, in whatever encoding the file uses
    pub content: Vec<u8>,
}

impl SourceArtifact {
    pub fn new(relative_path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

/// Freshly derived content bound for a destination inside the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateArtifact {
    pub kind: ArtifactKind,
    /// Destination relative to the source tree
    pub destination: PathBuf,
    pub bytes: Vec<u8>,
}

impl CandidateArtifact {
    pub fn new(kind: ArtifactKind, destination: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            destination: destination.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute location of this artifact inside `tree`
    pub fn absolute_path(&self, tree: &Path) -> PathBuf {
        tree.join(&self.destination)
    }
}

/// Both final artifacts of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedArtifacts {
    pub merged: CandidateArtifact,
    pub wrapped: CandidateArtifact,
}

impl DerivedArtifacts {
    pub fn iter(&self) -> impl Iterator<Item = &CandidateArtifact> {
        [&self.merged, &self.wrapped].into_iter()
    }

    pub fn into_vec(self) -> Vec<CandidateArtifact> {
        vec![self.merged, self.wrapped]
    }
}
