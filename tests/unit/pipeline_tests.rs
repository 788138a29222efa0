/*!
 * Tests for the pipeline orchestrator.
 *
 * Covers:
 * - Stage ordering and data flow between stages
 * - Failure propagation naming the failing stage
 * - Determinism of the native backend
 * - Destination naming of the derived artifacts
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bisub::errors::{PipelineError, TransformError};
use bisub::pipeline::{ArtifactKind, Pipeline, SourceArtifact};
use bisub::subtitle_processor::SubtitleCollection;
use bisub::transform::{NativeTransforms, StageName, WrapOptions};

use crate::common::{self, mock_transforms::ScriptedTransforms};

fn options() -> WrapOptions {
    WrapOptions { threshold: 20, bracket_factor: 2 }
}

#[tokio::test]
async fn test_run_withScriptedStages_shouldFeedExtractIntoWrap() {
    let transforms = Arc::new(ScriptedTransforms::new("M", "E", "W"));
    let pipeline = Pipeline::new(transforms.clone());

    let (merged, wrapped) = pipeline.run(b"SRC", options()).await.unwrap();
    assert_eq!(merged, b"M");
    assert_eq!(wrapped, b"W");

    let invocations = transforms.invocations();
    assert_eq!(invocations.len(), 3);

    let position = |stage: StageName| invocations.iter().position(|(s, _)| *s == stage).unwrap();
    assert!(position(StageName::ExtractPrimaryLanguage) < position(StageName::WrapLines));

    let input_of = |stage: StageName| invocations[position(stage)].1.clone();
    assert_eq!(input_of(StageName::MergeBilingual), "SRC");
    assert_eq!(input_of(StageName::ExtractPrimaryLanguage), "SRC");
    assert_eq!(input_of(StageName::WrapLines), "E|20|2");
}

#[tokio::test]
async fn test_run_withFailingExtract_shouldAbortWithoutWrapping() {
    let transforms = Arc::new(ScriptedTransforms::failing(StageName::ExtractPrimaryLanguage));
    let pipeline = Pipeline::new(transforms.clone());

    let result = pipeline.run(b"SRC", options()).await;
    match result {
        Err(PipelineError::Transform(TransformError::StageFailed { stage, .. })) => {
            assert_eq!(stage, StageName::ExtractPrimaryLanguage)
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(transforms.invocations().iter().all(|(stage, _)| *stage != StageName::WrapLines));
}

#[tokio::test]
async fn test_run_withFailingMerge_shouldReportMergeStage() {
    let pipeline = Pipeline::new(Arc::new(ScriptedTransforms::failing(StageName::MergeBilingual)));

    let result = pipeline.run(b"SRC", options()).await;
    assert!(matches!(
        result,
        Err(PipelineError::Transform(TransformError::StageFailed { stage: StageName::MergeBilingual, .. }))
    ));
}

#[tokio::test]
async fn test_run_withNativeBackend_shouldBeDeterministic() {
    let pipeline = Pipeline::new(Arc::new(NativeTransforms::new()));

    let first = pipeline.run(common::BILINGUAL_SRT.as_bytes(), options()).await.unwrap();
    let second = pipeline.run(common::BILINGUAL_SRT.as_bytes(), options()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_run_withNativeBackend_shouldProduceExpectedShapes() {
    let pipeline = Pipeline::new(Arc::new(NativeTransforms::new()));
    let (merged, wrapped) = pipeline.run(common::BILINGUAL_SRT.as_bytes(), options()).await.unwrap();

    let merged = SubtitleCollection::parse_srt_string(std::str::from_utf8(&merged).unwrap());
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.entries[0].lines, vec!["Welcome to the show.".to_string(), "欢迎收看本节目。".to_string()]);

    let wrapped = SubtitleCollection::parse_srt_string(std::str::from_utf8(&wrapped).unwrap());
    assert_eq!(wrapped.len(), 3);
    assert!(wrapped.entries.iter().all(|e| e.lines.iter().all(|l| !l.is_ascii())));
    // The bracketed second record is well past the threshold and gets split
    assert!(wrapped.entries[1].lines.len() > 1);
    assert_eq!(wrapped.entries[2].lines, vec!["感谢收看。".to_string()]);
}

#[tokio::test]
async fn test_run_withEnglishOnlySource_shouldYieldEmptyWrappedOutput() {
    let pipeline = Pipeline::new(Arc::new(NativeTransforms::new()));
    let source = "1\n00:00:01,000 --> 00:00:02,000\nEnglish only\n";

    let (merged, wrapped) = pipeline.run(source.as_bytes(), options()).await.unwrap();
    assert!(!merged.is_empty());
    assert!(wrapped.is_empty());
}

#[tokio::test]
async fn test_derive_shouldBindArtifactsToDestinations() {
    let pipeline = Pipeline::new(Arc::new(ScriptedTransforms::new("M", "E", "W")));
    let source = SourceArtifact::new("web/web.srt", "SRC");

    let artifacts = pipeline.derive(&source, Path::new("web"), options()).await.unwrap();

    assert_eq!(artifacts.merged.kind, ArtifactKind::Merged);
    assert_eq!(artifacts.merged.destination, PathBuf::from("web/web.Eng&Chs.srt"));
    assert_eq!(artifacts.merged.bytes, b"M".to_vec());
    assert_eq!(artifacts.wrapped.kind, ArtifactKind::Wrapped);
    assert_eq!(artifacts.wrapped.destination, PathBuf::from("web/web.Chs.srt"));
    assert_eq!(artifacts.wrapped.bytes, b"W".to_vec());
}
