use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::change_detector;
use crate::errors::AppError;
use crate::file_utils::{to_slash_path, FileManager};
use crate::pipeline::{self, Pipeline, SourceArtifact};
use crate::publisher::{PublishResult, Publisher};
use crate::transform::{self, TransformStage, WrapOptions};
use crate::vcs::{GitRepository, VersionControl};

// @module: Application controller for one derivation run

/// Everything a single run needs to know about its inputs
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Root of the managed tree
    pub source_tree: PathBuf,
    /// Source subtitle file, relative to the tree
    pub source_file: PathBuf,
    /// Destination directory, relative to the tree
    pub dest_dir: PathBuf,
    /// Location of the external stage scripts
    pub tools_dir: PathBuf,
    /// Full ref of the source branch, e.g. `refs/heads/main`
    pub source_ref: String,
    pub wrap: WrapOptions,
}

/// What a run produced and published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Destination of the merged artifact, relative to the tree
    pub merged_path: PathBuf,
    /// Destination of the wrapped artifact, relative to the tree
    pub wrapped_path: PathBuf,
    /// Destinations that differed from the persisted files
    pub changed: Vec<PathBuf>,
    pub result: PublishResult,
}

impl RunReport {
    /// Machine-readable result lines; values are empty unless something was published
    pub fn output_pairs(&self) -> Vec<(&'static str, String)> {
        let (merged, wrapped) = if self.result.is_published() {
            (to_slash_path(&self.merged_path), to_slash_path(&self.wrapped_path))
        } else {
            (String::new(), String::new())
        };

        vec![("eng_chs_path", merged), ("chs_path", wrapped)]
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Transform backend override
    transforms: Option<Arc<dyn TransformStage>>,

    // @field: Version-control backend override
    vcs: Option<Arc<dyn VersionControl>>,

    // @field: Detect changes without publishing
    dry_run: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Config(format!("{:#}", e)))?;

        Ok(Self {
            config,
            transforms: None,
            vcs: None,
            dry_run: false,
        })
    }

    /// Use a specific transform backend instead of the configured one
    pub fn with_transforms(mut self, transforms: Arc<dyn TransformStage>) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// Use a specific version-control backend instead of git
    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that every input location exists before anything runs
    pub fn check_environment(request: &RunRequest) -> Result<(), AppError> {
        if !FileManager::dir_exists(&request.source_tree) {
            return Err(AppError::MissingSourceTree(request.source_tree.clone()));
        }

        let source = request.source_tree.join(&request.source_file);
        if !FileManager::file_exists(&source) {
            return Err(AppError::MissingSourceFile(source));
        }

        if !FileManager::dir_exists(&request.tools_dir) {
            return Err(AppError::MissingToolsDir(request.tools_dir.clone()));
        }

        Ok(())
    }

    /// Run the whole derive, detect and publish workflow once
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, AppError> {
        let start_time = Instant::now();

        Self::check_environment(request)?;

        let transforms = self
            .transforms
            .clone()
            .unwrap_or_else(|| transform::backend_from_config(&self.config, &request.tools_dir));
        transforms.check_available().await?;

        let source_path = request.source_tree.join(&request.source_file);
        let content = FileManager::read_bytes(&source_path)?;
        let source = SourceArtifact::new(&request.source_file, content);

        let artifacts = Pipeline::new(transforms)
            .derive(&source, &request.dest_dir, request.wrap)
            .await?;
        pipeline::validate_all(&artifacts)?;

        let merged_path = artifacts.merged.destination.clone();
        let wrapped_path = artifacts.wrapped.destination.clone();

        let change_set = change_detector::detect(&request.source_tree, artifacts.into_vec())?;
        let changed = change_set.paths();
        debug!("{} of 2 derived artifacts changed", changed.len());

        let result = if self.dry_run {
            for path in &changed {
                info!("Would publish {}", path.display());
            }
            if changed.is_empty() {
                PublishResult::NothingChanged
            } else {
                PublishResult::WouldPublish { paths: changed.clone() }
            }
        } else {
            self.publisher(&request.source_tree)
                .publish(&change_set, &request.source_ref, &request.source_file)
                .await?
        };

        info!(
            "Run completed in {}.",
            Self::format_duration(start_time.elapsed())
        );

        Ok(RunReport {
            merged_path,
            wrapped_path,
            changed,
            result,
        })
    }

    fn publisher(&self, tree: &Path) -> Publisher {
        let vcs: Arc<dyn VersionControl> = match &self.vcs {
            Some(vcs) => vcs.clone(),
            None => Arc::new(GitRepository::new(tree, self.config.publish.timeout())),
        };
        Publisher::new(tree, vcs, self.config.publish.clone())
    }

    /// Format a duration as human readable text
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if total_secs >= 60 {
            format!("{}m {}s", total_secs / 60, total_secs % 60)
        } else {
            format!("{}.{:03}s", total_secs, millis)
        }
    }
}
