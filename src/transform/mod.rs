/*!
 * Transform stages applied to subtitle content.
 *
 * A run uses three named stages:
 * - `merge-bilingual`: one record set carrying both languages
 * - `extract-primary-language`: Chinese text only, unwrapped
 * - `wrap-lines`: re-flow long lines of the extracted form
 *
 * The [`TransformStage`] trait is the seam between the pipeline and the
 * implementation, allowing the in-process backend and the subprocess
 * backend to be used interchangeably. Content crosses the seam as raw
 * bytes; only a backend that needs text decodes it.
 */

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::app_config::{Config, TransformBackend, WrapConfig};
use crate::errors::TransformError;

pub mod external;
pub mod native;

pub use external::ExternalTransforms;
pub use native::NativeTransforms;

/// Identifies one of the three transform stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    MergeBilingual,
    ExtractPrimaryLanguage,
    WrapLines,
}

impl StageName {
    pub const ALL: [StageName; 3] = [
        StageName::MergeBilingual,
        StageName::ExtractPrimaryLanguage,
        StageName::WrapLines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MergeBilingual => "merge-bilingual",
            Self::ExtractPrimaryLanguage => "extract-primary-language",
            Self::WrapLines => "wrap-lines",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric controls for the wrap stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOptions {
    /// Effective width above which a line is split; 0 disables wrapping
    pub threshold: usize,
    /// Width multiplier for characters inside brackets
    pub bracket_factor: usize,
}

impl Default for WrapOptions {
    fn default() -> Self {
        WrapConfig::default().into()
    }
}

impl From<WrapConfig> for WrapOptions {
    fn from(config: WrapConfig) -> Self {
        Self {
            threshold: config.threshold,
            bracket_factor: config.bracket_factor,
        }
    }
}

/// Common trait for all transform stage backends
#[async_trait]
pub trait TransformStage: Send + Sync + fmt::Debug {
    /// Produce a record set carrying both source languages
    async fn merge_bilingual(&self, content: &[u8]) -> Result<Vec<u8>, TransformError>;

    /// Strip everything but the primary language, without wrapping
    async fn extract_primary_language(&self, content: &[u8]) -> Result<Vec<u8>, TransformError>;

    /// Re-flow long lines of extracted content
    async fn wrap_lines(&self, content: &[u8], options: WrapOptions) -> Result<Vec<u8>, TransformError>;

    /// Check that every stage can actually run, before any work starts
    async fn check_available(&self) -> Result<(), TransformError> {
        Ok(())
    }
}

/// Build the configured backend
pub fn backend_from_config(config: &Config, tools_dir: &std::path::Path) -> Arc<dyn TransformStage> {
    match config.transform.backend {
        TransformBackend::Native => Arc::new(NativeTransforms::new()),
        TransformBackend::External => Arc::new(ExternalTransforms::new(
            tools_dir.to_path_buf(),
            config.transform.executor.clone(),
            config.transform.timeout(),
        )),
    }
}
