/*!
 * End-to-end tests for one derivation run against an in-memory version control
 */

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bisub::app_controller::Controller;
use bisub::errors::{exit_codes, AppError, PipelineError};
use bisub::pipeline::{ArtifactKind, Pipeline};
use bisub::publisher::PublishResult;
use bisub::transform::{NativeTransforms, WrapOptions};

use crate::common::{self, mock_vcs::{RecordingVcs, VcsCall}};

fn controller(vcs: Arc<RecordingVcs>) -> Result<Controller> {
    Ok(Controller::with_config(common::native_config())?.with_vcs(vcs))
}

/// Test the first run on a fresh tree creates and publishes both artifacts
#[tokio::test]
async fn test_run_withFreshTree_shouldPublishBothArtifacts() -> Result<()> {
    common::init_test_logging();
    let (tree, tools) = common::create_source_tree(common::BILINGUAL_SRT)?;
    let vcs = Arc::new(RecordingVcs::new());
    let request = common::web_request(tree.path(), tools.path(), "refs/heads/main");

    let report = controller(vcs.clone())?.run(&request).await?;

    let merged = PathBuf::from("web/web.Eng&Chs.srt");
    let wrapped = PathBuf::from("web/web.Chs.srt");
    assert_eq!(report.merged_path, merged);
    assert_eq!(report.wrapped_path, wrapped);
    assert_eq!(
        report.result,
        PublishResult::Published {
            branch: "main".to_string(),
            paths: vec![merged.clone(), wrapped.clone()],
        }
    );

    let merged_text = fs::read_to_string(tree.path().join(&merged))?;
    assert!(merged_text.contains("Welcome to the show.\n欢迎收看本节目。"));
    let wrapped_text = fs::read_to_string(tree.path().join(&wrapped))?;
    assert!(!wrapped_text.contains("Welcome"));
    assert!(wrapped_text.contains("感谢收看。"));

    assert_eq!(vcs.commits(), 1);
    assert_eq!(vcs.pushes(), vec![("origin".to_string(), "main".to_string())]);
    assert_eq!(
        report.output_pairs(),
        vec![
            ("eng_chs_path", "web/web.Eng&Chs.srt".to_string()),
            ("chs_path", "web/web.Chs.srt".to_string()),
        ]
    );

    Ok(())
}

/// Test that a second run over unchanged input is a complete no-op
#[tokio::test]
async fn test_run_twice_shouldNotPublishSecondTime() -> Result<()> {
    let (tree, tools) = common::create_source_tree(common::BILINGUAL_SRT)?;
    let request = common::web_request(tree.path(), tools.path(), "refs/heads/main");

    controller(Arc::new(RecordingVcs::new()))?.run(&request).await?;

    let second_vcs = Arc::new(RecordingVcs::new());
    let report = controller(second_vcs.clone())?.run(&request).await?;

    assert!(report.changed.is_empty());
    assert_eq!(report.result, PublishResult::NothingChanged);
    assert!(second_vcs.calls().is_empty());
    assert_eq!(
        report.output_pairs(),
        vec![("eng_chs_path", String::new()), ("chs_path", String::new())]
    );

    Ok(())
}

/// Test that only the artifact that differs is written and committed
#[tokio::test]
async fn test_run_withMergedUpToDate_shouldPublishOnlyWrapped() -> Result<()> {
    let (tree, tools) = common::create_source_tree(common::BILINGUAL_SRT)?;
    let (merged, _) = Pipeline::new(Arc::new(NativeTransforms::new()))
        .run(common::BILINGUAL_SRT.as_bytes(), WrapOptions { threshold: 20, bracket_factor: 2 })
        .await?;
    fs::write(tree.path().join("web/web.Eng&Chs.srt"), &merged)?;

    let vcs = Arc::new(RecordingVcs::new());
    let request = common::web_request(tree.path(), tools.path(), "refs/heads/main");
    let report = controller(vcs.clone())?.run(&request).await?;

    let wrapped = PathBuf::from("web/web.Chs.srt");
    assert_eq!(report.changed, vec![wrapped.clone()]);
    assert_eq!(report.result.published_paths(), &[wrapped.clone()]);
    assert_eq!(vcs.calls()[0], VcsCall::Stage(vec![wrapped]));
    // Both destinations are reported once anything was published
    assert_eq!(report.output_pairs()[0].1, "web/web.Eng&Chs.srt");

    Ok(())
}

/// Test that an empty derived artifact stops the run before anything is written
#[tokio::test]
async fn test_run_withEnglishOnlySource_shouldFailValidation() -> Result<()> {
    let source = "1\n00:00:01,000 --> 00:00:02,000\nEnglish only\n";
    let (tree, tools) = common::create_source_tree(source)?;
    let vcs = Arc::new(RecordingVcs::new());
    let request = common::web_request(tree.path(), tools.path(), "refs/heads/main");

    let error = controller(vcs.clone())?.run(&request).await.unwrap_err();

    assert!(matches!(error, AppError::Pipeline(PipelineError::EmptyArtifact(ArtifactKind::Wrapped))));
    assert_eq!(error.exit_code(), exit_codes::EMPTY_WRAPPED_ARTIFACT);
    assert!(!tree.path().join("web/web.Eng&Chs.srt").exists());
    assert!(!tree.path().join("web/web.Chs.srt").exists());
    assert!(vcs.calls().is_empty());

    Ok(())
}

/// Test that an unresolvable ref fails with its own exit code
#[tokio::test]
async fn test_run_withDetachedTree_shouldFailBranchResolution() -> Result<()> {
    let (tree, tools) = common::create_source_tree(common::BILINGUAL_SRT)?;
    let vcs = Arc::new(RecordingVcs::detached());
    let request = common::web_request(tree.path(), tools.path(), "0123abcd");

    let error = controller(vcs.clone())?.run(&request).await.unwrap_err();

    assert_eq!(error.exit_code(), exit_codes::UNRESOLVED_BRANCH);
    assert!(vcs.pushes().is_empty());

    Ok(())
}
