use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Largest accepted width multiplier for bracketed text
pub const MAX_BRACKET_FACTOR: usize = 100;

/// Application configuration module
/// This module handles the run configuration: wrap controls, the transform
/// backend, the publish identity and log verbosity. Nothing here is
/// process-global; each run gets its own `Config`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Line wrapping controls for the Chinese-only artifact
    #[serde(default)]
    pub wrap: WrapConfig,

    /// Transform stage backend settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Commit and push settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Wrap stage numeric controls
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WrapConfig {
    /// Effective line width above which a line is split
    #[serde(default = "default_wrap_threshold")]
    pub threshold: usize,

    /// Weight applied to characters inside brackets
    #[serde(default = "default_bracket_factor")]
    pub bracket_factor: usize,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            threshold: default_wrap_threshold(),
            bracket_factor: default_bracket_factor(),
        }
    }
}

/// Which implementation runs the transform stages
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransformBackend {
    // @backend: Scripts from the tools location, run by an external executor
    #[default]
    External,
    // @backend: In-process implementation
    Native,
}

impl TransformBackend {
    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::External => "external".to_string(),
            Self::Native => "native".to_string(),
        }
    }
}

impl std::fmt::Display for TransformBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TransformBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "external" => Ok(Self::External),
            "native" => Ok(Self::Native),
            _ => Err(anyhow!("Invalid transform backend: {}", s)),
        }
    }
}

/// Transform backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformConfig {
    /// Backend used for the three stages
    #[serde(default)]
    pub backend: TransformBackend,

    /// Executor program for the external backend
    #[serde(default = "default_executor")]
    pub executor: String,

    /// Timeout for a single stage subprocess in seconds
    #[serde(default = "default_stage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            backend: TransformBackend::default(),
            executor: default_executor(),
            timeout_secs: default_stage_timeout_secs(),
        }
    }
}

impl TransformConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Commit identity used for every generated commit
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: default_author_name(),
            email: default_author_email(),
        }
    }
}

/// Publish step configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PublishConfig {
    /// Author and committer identity
    #[serde(default)]
    pub identity: CommitIdentity,

    /// Commit message template
    /// Placeholders: {source}
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Remote the branch is force-pushed to
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Timeout for a single git invocation in seconds
    #[serde(default = "default_git_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            identity: CommitIdentity::default(),
            commit_message: default_commit_message(),
            remote: default_remote(),
            timeout_secs: default_git_timeout_secs(),
        }
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Render the commit message for the given source file
    pub fn render_commit_message(&self, source: &str) -> String {
        self.commit_message.replace("{source}", source)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_wrap_threshold() -> usize {
    20
}

fn default_bracket_factor() -> usize {
    2
}

fn default_executor() -> String {
    "awk".to_string()
}

fn default_stage_timeout_secs() -> u64 {
    60
}

fn default_author_name() -> String {
    "subtitle-bot".to_string()
}

fn default_author_email() -> String {
    "subtitle-bot@users.noreply.github.com".to_string()
}

fn default_commit_message() -> String {
    "Update derived subtitles for {source}".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_git_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Load a configuration file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.wrap.bracket_factor == 0 {
            return Err(anyhow!("Bracket factor must be at least 1"));
        }

        if self.wrap.bracket_factor > MAX_BRACKET_FACTOR {
            return Err(anyhow!(
                "Bracket factor {} is too large (maximum {})",
                self.wrap.bracket_factor,
                MAX_BRACKET_FACTOR
            ));
        }

        if self.transform.backend == TransformBackend::External && self.transform.executor.trim().is_empty() {
            return Err(anyhow!("An executor is required for the external transform backend"));
        }

        let identity = &self.publish.identity;
        if identity.name.trim().is_empty() || identity.email.trim().is_empty() {
            return Err(anyhow!("Commit identity requires both a name and an email"));
        }
        if !identity.email.contains('@') {
            return Err(anyhow!("Invalid commit email: {}", identity.email));
        }

        if self.publish.remote.trim().is_empty() {
            return Err(anyhow!("Publish remote must not be empty"));
        }

        if self.transform.timeout_secs == 0 || self.publish.timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }

        Ok(())
    }
}
