/*!
 * Tests for error types, conversions and exit codes
 */

use std::path::PathBuf;
use std::time::Duration;

use bisub::errors::{exit_codes, AppError, PipelineError, PublishError, TransformError, VcsError};
use bisub::pipeline::ArtifactKind;
use bisub::transform::StageName;

#[test]
fn test_transformError_stageFailed_shouldNameStage() {
    let error = TransformError::stage_failed(StageName::WrapLines, "boom");
    let display = format!("{}", error);
    assert!(display.contains("wrap-lines"));
    assert!(display.contains("boom"));
}

#[test]
fn test_appError_exitCodes_shouldBeDistinctPerFailureClass() {
    let errors = vec![
        AppError::Usage("missing".to_string()),
        AppError::MissingSourceTree(PathBuf::from("/tree")),
        AppError::MissingSourceFile(PathBuf::from("/tree/a.srt")),
        AppError::MissingToolsDir(PathBuf::from("/tools")),
        TransformError::MissingCapability {
            stage: StageName::MergeBilingual,
            path: PathBuf::from("/tools/merge-bilingual.awk"),
        }
        .into(),
        TransformError::ExecutorUnavailable {
            executor: "awk".to_string(),
            message: "not found".to_string(),
        }
        .into(),
        PipelineError::EmptyArtifact(ArtifactKind::Merged).into(),
        PipelineError::EmptyArtifact(ArtifactKind::Wrapped).into(),
        PublishError::BranchResolution { reference: "HEAD".to_string() }.into(),
    ];

    let codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
    assert_eq!(
        codes,
        vec![
            exit_codes::USAGE,
            exit_codes::MISSING_SOURCE_TREE,
            exit_codes::MISSING_SOURCE_FILE,
            exit_codes::MISSING_TOOLS_DIR,
            exit_codes::MISSING_CAPABILITY,
            exit_codes::EXECUTOR_UNAVAILABLE,
            exit_codes::EMPTY_MERGED_ARTIFACT,
            exit_codes::EMPTY_WRAPPED_ARTIFACT,
            exit_codes::UNRESOLVED_BRANCH,
        ]
    );

    let mut unique = codes.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), codes.len());
    assert!(!codes.contains(&exit_codes::SUCCESS));
}

#[test]
fn test_appError_otherFailures_shouldUseGeneralExitCode() {
    let stage_failure: AppError = TransformError::stage_failed(StageName::MergeBilingual, "x").into();
    assert_eq!(stage_failure.exit_code(), exit_codes::GENERAL_FAILURE);

    let push_failure: AppError = PublishError::Vcs(VcsError::Timeout {
        command: "push".to_string(),
        timeout: Duration::from_secs(5),
    })
    .into();
    assert_eq!(push_failure.exit_code(), exit_codes::GENERAL_FAILURE);
}

#[test]
fn test_appError_fromIoError_shouldWrapAsFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let app_error: AppError = io_error.into();
    let display = format!("{}", app_error);
    assert!(display.contains("File error"));
    assert!(display.contains("File not found"));
}

#[test]
fn test_pipelineError_emptyArtifact_shouldNameArtifact() {
    let display = format!("{}", PipelineError::EmptyArtifact(ArtifactKind::Wrapped));
    assert!(display.contains("wrapped"));
}
