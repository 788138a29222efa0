use log::error;

use crate::errors::PipelineError;

use super::{CandidateArtifact, DerivedArtifacts};

// @module: Output validation gate

/// Reject a zero-byte artifact.
///
/// An empty result is a pipeline defect, never a "no changes" condition.
pub fn validate(artifact: &CandidateArtifact) -> Result<(), PipelineError> {
    if artifact.is_empty() {
        error!("Pipeline produced an empty {} artifact for {:?}", artifact.kind, artifact.destination);
        return Err(PipelineError::EmptyArtifact(artifact.kind));
    }
    Ok(())
}

/// Validate both artifacts, merged first
pub fn validate_all(artifacts: &DerivedArtifacts) -> Result<(), PipelineError> {
    artifacts.iter().try_for_each(validate)
}
