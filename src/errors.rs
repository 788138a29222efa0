/*!
 * Error types for the bisub application.
 *
 * This module contains custom error types for the different stages of a run,
 * using the thiserror crate for ergonomic error definitions. Every fatal
 * condition ends up in [`AppError`], which knows the process exit code for
 * its failure class.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::ArtifactKind;
use crate::transform::StageName;

/// Process exit codes, one per failure class
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_FAILURE: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const MISSING_SOURCE_TREE: i32 = 3;
    pub const MISSING_SOURCE_FILE: i32 = 4;
    pub const MISSING_TOOLS_DIR: i32 = 5;
    pub const MISSING_CAPABILITY: i32 = 6;
    pub const EXECUTOR_UNAVAILABLE: i32 = 7;
    pub const EMPTY_MERGED_ARTIFACT: i32 = 8;
    pub const EMPTY_WRAPPED_ARTIFACT: i32 = 9;
    pub const UNRESOLVED_BRANCH: i32 = 10;
}

/// Errors raised by a transform stage backend
#[derive(Error, Debug)]
pub enum TransformError {
    /// The stage ran but failed or produced unusable output
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed {
        stage: StageName,
        message: String,
    },

    /// The script implementing a stage is not present in the tools location
    #[error("Missing transformation capability for stage '{stage}': {path:?} not found")]
    MissingCapability {
        stage: StageName,
        path: PathBuf,
    },

    /// The external executor could not be started
    #[error("External executor '{executor}' is unavailable: {message}")]
    ExecutorUnavailable {
        executor: String,
        message: String,
    },
}

impl TransformError {
    pub fn stage_failed(stage: StageName, message: impl Into<String>) -> Self {
        Self::StageFailed { stage, message: message.into() }
    }
}

/// Errors that abort the derivation pipeline before anything is written
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage invocation failed
    #[error("Transform failure: {0}")]
    Transform(#[from] TransformError),

    /// A final artifact came out with zero bytes
    #[error("Empty {0} artifact produced by the pipeline")]
    EmptyArtifact(ArtifactKind),
}

/// Errors reported by the version-control collaborator
#[derive(Error, Debug)]
pub enum VcsError {
    /// The command ran and exited unsuccessfully
    #[error("`git {command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The command could not be started at all
    #[error("Failed to run `git {command}`: {message}")]
    Spawn {
        command: String,
        message: String,
    },

    /// The command did not finish in time
    #[error("`git {command}` timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: Duration,
    },
}

/// Errors that can occur while publishing a change set
#[derive(Error, Debug)]
pub enum PublishError {
    /// Writing an artifact into the tree failed
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A version-control operation failed
    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),

    /// No branch could be resolved for the push
    #[error("Unable to resolve target branch from ref '{reference}' (detached or unknown HEAD)")]
    BranchResolution {
        reference: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing command line arguments
    #[error("Usage error: {0}")]
    Usage(String),

    /// The source tree directory does not exist
    #[error("Source tree does not exist: {0:?}")]
    MissingSourceTree(PathBuf),

    /// The source subtitle file does not exist
    #[error("Source file does not exist: {0:?}")]
    MissingSourceFile(PathBuf),

    /// The external tools directory does not exist
    #[error("External tools location does not exist: {0:?}")]
    MissingToolsDir(PathBuf),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the derivation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error from the publish step
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl AppError {
    /// Exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        use exit_codes::*;

        match self {
            Self::Usage(_) => USAGE,
            Self::MissingSourceTree(_) => MISSING_SOURCE_TREE,
            Self::MissingSourceFile(_) => MISSING_SOURCE_FILE,
            Self::MissingToolsDir(_) => MISSING_TOOLS_DIR,
            Self::Pipeline(PipelineError::Transform(TransformError::MissingCapability { .. })) => MISSING_CAPABILITY,
            Self::Pipeline(PipelineError::Transform(TransformError::ExecutorUnavailable { .. })) => EXECUTOR_UNAVAILABLE,
            Self::Pipeline(PipelineError::EmptyArtifact(ArtifactKind::Merged)) => EMPTY_MERGED_ARTIFACT,
            Self::Pipeline(PipelineError::EmptyArtifact(ArtifactKind::Wrapped)) => EMPTY_WRAPPED_ARTIFACT,
            Self::Publish(PublishError::BranchResolution { .. }) => UNRESOLVED_BRANCH,
            _ => GENERAL_FAILURE,
        }
    }
}

impl From<TransformError> for AppError {
    fn from(error: TransformError) -> Self {
        Self::Pipeline(PipelineError::Transform(error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::File(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
