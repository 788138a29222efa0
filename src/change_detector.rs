/*!
 * Byte-for-byte change detection between candidate artifacts and the files
 * currently persisted in the tree.
 *
 * Nothing in this module writes, renames or deletes anything.
 */

use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::pipeline::CandidateArtifact;

/// How a candidate relates to the persisted file at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No file exists at the destination yet
    Created,
    /// A file exists with different bytes
    Modified,
}

/// Outcome of comparing one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Unchanged,
    Changed(ChangeKind),
}

/// Compare candidate bytes with the file at `destination`
pub fn diff(candidate: &[u8], destination: &Path) -> std::io::Result<ChangeStatus> {
    match std::fs::read(destination) {
        Ok(existing) if existing == candidate => Ok(ChangeStatus::Unchanged),
        Ok(_) => Ok(ChangeStatus::Changed(ChangeKind::Modified)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ChangeStatus::Changed(ChangeKind::Created)),
        Err(e) => Err(e),
    }
}

/// A candidate that needs publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub artifact: CandidateArtifact,
    pub kind: ChangeKind,
}

/// Destinations whose candidates differ from what is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: CandidateArtifact, kind: ChangeKind) {
        self.changes.push(Change { artifact, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Relative destination paths, in candidate order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.changes.iter().map(|c| c.artifact.destination.clone()).collect()
    }
}

/// Build the change set for all candidates against the tree rooted at `tree`.
///
/// Every comparison completes before the caller mutates anything.
pub fn detect<I>(tree: &Path, candidates: I) -> std::io::Result<ChangeSet>
where
    I: IntoIterator<Item = CandidateArtifact>,
{
    let mut change_set = ChangeSet::new();

    for candidate in candidates {
        let status = diff(&candidate.bytes, &candidate.absolute_path(tree))?;
        debug!("{}: {:?}", candidate.destination.display(), status);

        if let ChangeStatus::Changed(kind) = status {
            change_set.push(candidate, kind);
        }
    }

    Ok(change_set)
}
