/*!
 * Idempotent publisher.
 *
 * Writes exactly the changed artifacts into the tree, commits them as one
 * unit under a fixed identity, resolves the target branch and force-pushes
 * it. An empty change set is a no-op: nothing is written, tracked, committed
 * or pushed.
 */

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::PublishConfig;
use crate::change_detector::ChangeSet;
use crate::errors::PublishError;
use crate::file_utils::{to_slash_path, FileManager};
use crate::vcs::{resolve_branch, CommitOutcome, VersionControl};

/// Observable outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    /// Every candidate matched what was already persisted
    NothingChanged,
    /// Changes were committed and pushed
    Published {
        branch: String,
        /// Relative paths included in the commit; empty when the commit was a no-op
        paths: Vec<PathBuf>,
    },
    /// Dry run: these paths differ but nothing was written or pushed
    WouldPublish {
        paths: Vec<PathBuf>,
    },
}

impl PublishResult {
    pub fn published_paths(&self) -> &[PathBuf] {
        match self {
            Self::NothingChanged | Self::WouldPublish { .. } => &[],
            Self::Published { paths, .. } => paths,
        }
    }

    pub fn is_published(&self) -> bool {
        !self.published_paths().is_empty()
    }
}

/// Publishes change sets into one working tree
#[derive(Debug, Clone)]
pub struct Publisher {
    // @field: Root of the managed tree
    tree: PathBuf,

    // @field: Version-control backend for the tree
    vcs: Arc<dyn VersionControl>,

    // @field: Identity, message template and remote
    config: PublishConfig,
}

impl Publisher {
    pub fn new(tree: impl Into<PathBuf>, vcs: Arc<dyn VersionControl>, config: PublishConfig) -> Self {
        Self {
            tree: tree.into(),
            vcs,
            config,
        }
    }

    /// Publish a change set produced from `source` to the branch named by `branch_ref`
    pub async fn publish(&self, change_set: &ChangeSet, branch_ref: &str, source: &Path) -> Result<PublishResult, PublishError> {
        if change_set.is_empty() {
            info!("No derived subtitle changed, nothing to publish");
            return Ok(PublishResult::NothingChanged);
        }

        for change in change_set.changes() {
            let target = change.artifact.absolute_path(&self.tree);
            FileManager::write_atomic(&target, &change.artifact.bytes).map_err(|source| PublishError::Io {
                path: target.clone(),
                source,
            })?;
            info!("{:?} {}", change.kind, change.artifact.destination.display());
        }

        let paths = change_set.paths();
        self.vcs.stage(&paths).await?;

        let message = self
            .config
            .render_commit_message(&to_slash_path(source));
        let outcome = self.vcs.commit(&paths, &message, &self.config.identity).await?;

        // Resolved after the commit; a failure here leaves the commit unpushed
        let branch = resolve_branch(branch_ref, self.vcs.as_ref()).await.inspect_err(|_| {
            if outcome == CommitOutcome::Committed {
                warn!("Local commit was created but cannot be pushed: target branch is unknown");
            }
        })?;

        info!("Force-pushing {} to {}", branch, self.config.remote);
        self.vcs.force_push(&self.config.remote, &branch).await?;

        let paths = match outcome {
            CommitOutcome::Committed => paths,
            CommitOutcome::NothingToCommit => Vec::new(),
        };

        Ok(PublishResult::Published { branch, paths })
    }
}
