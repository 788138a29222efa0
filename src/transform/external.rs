/*!
 * Subprocess implementation of the transform stages.
 *
 * Each stage is a script in the external-tools location, named after the
 * stage (`merge-bilingual.awk`, `extract-primary-language.awk`,
 * `wrap-lines.awk`) and run by an external executor, `awk` by default.
 * The stage input is staged into a private temporary file; the stage output
 * is whatever the script prints on stdout. Bytes pass through untouched, so
 * the scripts see the source in its own encoding.
 */

use async_trait::async_trait;
use log::{debug, error};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::TransformError;

use super::{StageName, TransformStage, WrapOptions};

/// External transform backend
#[derive(Debug, Clone)]
pub struct ExternalTransforms {
    // @field: Directory holding the stage scripts
    tools_dir: PathBuf,

    // @field: Program that runs the scripts
    executor: String,

    // @field: Per-stage timeout
    timeout: Duration,
}

impl ExternalTransforms {
    pub fn new(tools_dir: PathBuf, executor: String, timeout: Duration) -> Self {
        Self {
            tools_dir,
            executor,
            timeout,
        }
    }

    /// Location of the script implementing a stage
    pub fn script_path(&self, stage: StageName) -> PathBuf {
        self.tools_dir.join(format!("{}.awk", stage.as_str()))
    }

    async fn run_stage(&self, stage: StageName, content: &[u8], variables: &[(&str, String)]) -> Result<Vec<u8>, TransformError> {
        let script = self.script_path(stage);
        if !script.is_file() {
            return Err(TransformError::MissingCapability { stage, path: script });
        }

        let mut input = tempfile::Builder::new()
            .prefix("bisub-stage-")
            .suffix(".srt")
            .tempfile()
            .map_err(|e| TransformError::stage_failed(stage, format!("failed to stage input: {}", e)))?;
        let staged = input.write_all(content);
        staged
            .and_then(|_| input.flush())
            .map_err(|e| TransformError::stage_failed(stage, format!("failed to stage input: {}", e)))?;

        let mut command = Command::new(&self.executor);
        for (name, value) in variables {
            command.arg("-v").arg(format!("{}={}", name, value));
        }
        command
            .arg("-f")
            .arg(&script)
            .arg(input.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running stage {} with {} {:?}", stage, self.executor, script);

        let output = tokio::select! {
            result = command.output() => {
                result.map_err(|e| TransformError::ExecutorUnavailable {
                    executor: self.executor.clone(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(TransformError::stage_failed(stage, format!("timed out after {:?}", self.timeout)));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Stage {} failed: {}", stage, stderr.trim());
            return Err(TransformError::stage_failed(
                stage,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl TransformStage for ExternalTransforms {
    async fn merge_bilingual(&self, content: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.run_stage(StageName::MergeBilingual, content, &[]).await
    }

    async fn extract_primary_language(&self, content: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.run_stage(StageName::ExtractPrimaryLanguage, content, &[]).await
    }

    async fn wrap_lines(&self, content: &[u8], options: WrapOptions) -> Result<Vec<u8>, TransformError> {
        let variables = [
            ("threshold", options.threshold.to_string()),
            ("factor", options.bracket_factor.to_string()),
        ];
        self.run_stage(StageName::WrapLines, content, &variables).await
    }

    async fn check_available(&self) -> Result<(), TransformError> {
        if find_executable(&self.executor).is_none() {
            return Err(TransformError::ExecutorUnavailable {
                executor: self.executor.clone(),
                message: "not found on PATH".to_string(),
            });
        }

        for stage in StageName::ALL {
            let path = self.script_path(stage);
            if !path.is_file() {
                return Err(TransformError::MissingCapability { stage, path });
            }
        }

        Ok(())
    }
}

/// Resolve a program name the way a shell would, without running it
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}
