/*!
 * # bisub - bilingual subtitle derivation and publishing
 *
 * A Rust library that derives two subtitle artifacts from one bilingual
 * (English + Chinese) SRT file and publishes only the artifacts that changed
 * back to a git working tree.
 *
 * ## Features
 *
 * - Merge both languages into one `.Eng&Chs.srt` file
 * - Extract the Chinese text and re-flow long lines into a `.Chs.srt` file
 * - Byte-for-byte change detection against the persisted files
 * - One commit per run under a fixed bot identity, force-pushed to the
 *   resolved branch; a run with no changes touches nothing
 * - Transform stages run either in-process or as external scripts
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing and serialization
 * - `transform`: The three transform stages:
 *   - `transform::native`: In-process implementation
 *   - `transform::external`: Script implementation run by an external executor
 * - `pipeline`: Stage orchestration and output validation
 * - `change_detector`: Candidate vs. persisted file comparison
 * - `vcs`: Version-control seam and its git backend
 * - `publisher`: Idempotent write, commit and force-push
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `errors`: Custom error types and exit codes
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod change_detector;
pub mod errors;
pub mod file_utils;
pub mod pipeline;
pub mod publisher;
pub mod subtitle_processor;
pub mod transform;
pub mod vcs;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunReport, RunRequest};
pub use change_detector::{ChangeKind, ChangeSet, ChangeStatus};
pub use errors::{AppError, PipelineError, PublishError, TransformError, VcsError};
pub use pipeline::{ArtifactKind, CandidateArtifact, Pipeline, SourceArtifact};
pub use publisher::{PublishResult, Publisher};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use transform::{StageName, TransformStage, WrapOptions};
pub use vcs::VersionControl;
