/*!
 * Version-control collaborator used by the publisher.
 *
 * The publisher only needs four operations: stage paths, commit them under a
 * fixed identity, ask for the current branch and force-push a branch. The
 * [`VersionControl`] trait keeps those behind a seam so the publisher can be
 * exercised against an in-memory double.
 */

use async_trait::async_trait;
use log::warn;
use std::fmt::Debug;
use std::path::PathBuf;

use crate::app_config::CommitIdentity;
use crate::errors::{PublishError, VcsError};

pub mod git;

pub use git::GitRepository;

/// Prefix of fully qualified branch refs
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was created
    Committed,
    /// The staged content matched HEAD
    NothingToCommit,
}

/// Common trait for version-control backends
#[async_trait]
pub trait VersionControl: Send + Sync + Debug {
    /// Mark paths (relative to the tree root) for the next commit
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Commit the staged paths as one unit
    async fn commit(&self, paths: &[PathBuf], message: &str, identity: &CommitIdentity) -> Result<CommitOutcome, VcsError>;

    /// Name of the checked-out branch, or `None` when detached
    async fn current_branch(&self) -> Result<Option<String>, VcsError>;

    /// Overwrite the remote branch tip with local history
    async fn force_push(&self, remote: &str, branch: &str) -> Result<(), VcsError>;
}

/// Branch name carried by a fully qualified branch ref, if any
pub fn branch_from_ref(reference: &str) -> Option<&str> {
    reference
        .trim()
        .strip_prefix(BRANCH_REF_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Resolve the branch to publish to.
///
/// An explicit `refs/heads/<name>` wins; anything else falls back to the
/// tree's current branch. Never guesses a default.
pub async fn resolve_branch(reference: &str, vcs: &dyn VersionControl) -> Result<String, PublishError> {
    if let Some(branch) = branch_from_ref(reference) {
        return Ok(branch.to_string());
    }

    let unresolved = || PublishError::BranchResolution {
        reference: reference.to_string(),
    };

    match vcs.current_branch().await {
        Ok(Some(branch)) if !branch.trim().is_empty() && branch.trim() != "HEAD" => Ok(branch.trim().to_string()),
        Ok(_) => Err(unresolved()),
        Err(e) => {
            warn!("Failed to query current branch: {}", e);
            Err(unresolved())
        }
    }
}
