/*!
 * Pipeline orchestrator for the derivation stages.
 *
 * The orchestrator runs two independent branches over the same source:
 * 1. `merge-bilingual` produces the merged artifact directly
 * 2. `extract-primary-language` feeds `wrap-lines`, producing the wrapped artifact
 *
 * The branches run concurrently. Wrap never starts before extract finishes.
 */

use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::transform::{TransformStage, WrapOptions};

use super::{ArtifactKind, CandidateArtifact, DerivedArtifacts, SourceArtifact};

/// Runs the transform stages for one source file
#[derive(Debug, Clone)]
pub struct Pipeline {
    transforms: Arc<dyn TransformStage>,
}

impl Pipeline {
    pub fn new(transforms: Arc<dyn TransformStage>) -> Self {
        Self { transforms }
    }

    /// Run all stages and return `(merged, wrapped)` content.
    ///
    /// Any failing stage aborts the run; no partial output is returned.
    pub async fn run(&self, source: &[u8], options: WrapOptions) -> Result<(Vec<u8>, Vec<u8>), PipelineError> {
        let start = Instant::now();

        let merge_branch = self.transforms.merge_bilingual(source);
        let wrap_branch = async {
            let extracted = self.transforms.extract_primary_language(source).await?;
            debug!("Extracted {} bytes of primary-language text", extracted.len());
            self.transforms.wrap_lines(&extracted, options).await
        };

        let (merged, wrapped) = tokio::join!(merge_branch, wrap_branch);
        let merged = merged?;
        let wrapped = wrapped?;

        debug!(
            "Pipeline finished in {:?}: merged {} bytes, wrapped {} bytes",
            start.elapsed(),
            merged.len(),
            wrapped.len()
        );

        Ok((merged, wrapped))
    }

    /// Run the stages and bind the results to their destinations under `dest_dir`
    pub async fn derive(
        &self,
        source: &SourceArtifact,
        dest_dir: &Path,
        options: WrapOptions,
    ) -> Result<DerivedArtifacts, PipelineError> {
        info!(
            "Deriving subtitles from {} (threshold={}, bracket factor={})",
            source.relative_path.display(),
            options.threshold,
            options.bracket_factor
        );

        let (merged, wrapped) = self.run(&source.content, options).await?;

        let merged_path = FileManager::derived_output_path(&source.relative_path, dest_dir, ArtifactKind::Merged);
        let wrapped_path = FileManager::derived_output_path(&source.relative_path, dest_dir, ArtifactKind::Wrapped);

        Ok(DerivedArtifacts {
            merged: CandidateArtifact::new(ArtifactKind::Merged, merged_path, merged),
            wrapped: CandidateArtifact::new(ArtifactKind::Wrapped, wrapped_path, wrapped),
        })
    }
}
