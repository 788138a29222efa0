use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::CommitIdentity;
use crate::errors::VcsError;
use crate::file_utils::to_slash_path;

use super::{CommitOutcome, VersionControl};

// @module: git command-line backend

/// Captured result of one git invocation
#[derive(Debug)]
struct GitOutput {
    code: i32,
    stdout: String,
    stderr: String,
}

/// A git working tree driven through the `git` command line
#[derive(Debug, Clone)]
pub struct GitRepository {
    // @field: Working tree root
    workdir: PathBuf,

    // @field: Per-command timeout
    timeout: Duration,
}

impl GitRepository {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }

    /// Run git in the working tree, failing fast on timeout.
    ///
    /// Credential prompts are disabled so a push can never wait on a terminal.
    async fn run(&self, args: &[String], envs: &[(&str, &str)]) -> Result<GitOutput, VcsError> {
        let command_line = args.join(" ");
        debug!("git {}", command_line);

        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in envs {
            command.env(key, value);
        }

        let output = tokio::select! {
            result = command.output() => {
                result.map_err(|e| VcsError::Spawn {
                    command: command_line.clone(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(VcsError::Timeout {
                    command: command_line,
                    timeout: self.timeout,
                });
            }
        };

        Ok(GitOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run git and treat any non-zero exit as an error
    async fn run_checked(&self, args: &[String], envs: &[(&str, &str)]) -> Result<GitOutput, VcsError> {
        let output = self.run(args, envs).await?;
        if output.code != 0 {
            return Err(VcsError::CommandFailed {
                command: args.join(" "),
                status: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn with_paths(mut args: Vec<String>, paths: &[PathBuf]) -> Vec<String> {
    args.push("--".to_string());
    args.extend(paths.iter().map(|p| to_slash_path(p)));
    args
}

#[async_trait]
impl VersionControl for GitRepository {
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        let args = with_paths(to_args(&["add"]), paths);
        self.run_checked(&args, &[]).await?;
        Ok(())
    }

    async fn commit(&self, paths: &[PathBuf], message: &str, identity: &CommitIdentity) -> Result<CommitOutcome, VcsError> {
        // `diff --cached --quiet` exits 1 when the index differs from HEAD
        let probe = with_paths(to_args(&["diff", "--cached", "--quiet"]), paths);
        let staged = self.run(&probe, &[]).await?;
        match staged.code {
            0 => {
                info!("Nothing to commit, staged content matches HEAD");
                return Ok(CommitOutcome::NothingToCommit);
            }
            1 => {}
            code => {
                return Err(VcsError::CommandFailed {
                    command: probe.join(" "),
                    status: code,
                    stderr: staged.stderr.trim().to_string(),
                });
            }
        }

        let name_config = format!("user.name={}", identity.name);
        let email_config = format!("user.email={}", identity.email);
        let args = with_paths(
            to_args(&[
                "-c", &name_config,
                "-c", &email_config,
                "-c", "commit.gpgsign=false",
                "commit", "--no-verify", "-m", message,
            ]),
            paths,
        );
        let envs = [
            ("GIT_AUTHOR_NAME", identity.name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
            ("GIT_COMMITTER_NAME", identity.name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
        ];

        let output = self.run_checked(&args, &envs).await?;
        debug!("{}", output.stdout.trim());

        Ok(CommitOutcome::Committed)
    }

    async fn current_branch(&self) -> Result<Option<String>, VcsError> {
        let args = to_args(&["symbolic-ref", "--quiet", "--short", "HEAD"]);
        let output = self.run(&args, &[]).await?;

        match output.code {
            0 => {
                let branch = output.stdout.trim();
                Ok((!branch.is_empty()).then(|| branch.to_string()))
            }
            // Detached HEAD
            1 => Ok(None),
            code => Err(VcsError::CommandFailed {
                command: args.join(" "),
                status: code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }

    async fn force_push(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        let refspec = format!("HEAD:refs/heads/{}", branch);
        let args = to_args(&["push", "--force", remote, &refspec]);
        self.run_checked(&args, &[]).await?;
        Ok(())
    }
}
