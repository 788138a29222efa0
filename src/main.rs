// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use log::{error, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, ValueEnum};

use bisub::app_config::{self, Config, TransformBackend};
use bisub::errors::{exit_codes, AppError};
use bisub::file_utils::FileManager;
use bisub::transform::WrapOptions;
use bisub::{Controller, PublishResult, RunReport, RunRequest};

/// CLI Wrapper for TransformBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTransformBackend {
    External,
    Native,
}

impl From<CliTransformBackend> for TransformBackend {
    fn from(cli_backend: CliTransformBackend) -> Self {
        match cli_backend {
            CliTransformBackend::External => TransformBackend::External,
            CliTransformBackend::Native => TransformBackend::Native,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// bisub - derive merged and Chinese-only subtitles and publish the changes
#[derive(Parser, Debug)]
#[command(name = "bisub")]
#[command(version)]
#[command(about = "Derive Eng&Chs and Chs subtitles from a bilingual SRT and publish changed files")]
#[command(long_about = "bisub reads one bilingual subtitle file from a git working tree, derives
<name>.Eng&Chs.srt and <name>.Chs.srt, and commits and force-pushes only the
files whose bytes changed. A run with no changes leaves the tree untouched.

EXAMPLES:
    bisub . web/web.srt web ./tools refs/heads/main
    bisub . web/web.srt web ./tools refs/heads/main 24 3
    bisub --backend native --dry-run . web/web.srt web ./tools HEAD

OUTPUT:
    On stdout: eng_chs_path=<path> and chs_path=<path>, both empty when nothing
    was published. The same lines are appended to $GITHUB_OUTPUT when set.")]
struct CommandLineOptions {
    /// Root of the git working tree
    #[arg(value_name = "SOURCE_TREE")]
    source_tree: PathBuf,

    /// Bilingual subtitle file, relative to the source tree
    #[arg(value_name = "SOURCE_FILE")]
    source_file: PathBuf,

    /// Destination directory, relative to the source tree
    #[arg(value_name = "DEST_DIR")]
    dest_dir: PathBuf,

    /// Directory holding the external stage scripts
    #[arg(value_name = "TOOLS_DIR")]
    tools_dir: PathBuf,

    /// Full ref of the source branch (e.g. refs/heads/main)
    #[arg(value_name = "SOURCE_REF")]
    source_ref: String,

    /// Effective line width above which Chinese lines are wrapped
    #[arg(value_name = "WRAP_THRESHOLD")]
    wrap_threshold: Option<usize>,

    /// Width multiplier for bracketed text
    #[arg(value_name = "BRACKET_FACTOR")]
    bracket_factor: Option<usize>,

    /// Configuration file path
    #[arg(short, long, env = "BISUB_CONFIG")]
    config_path: Option<PathBuf>,

    /// Transform stage backend
    #[arg(short, long, value_enum)]
    backend: Option<CliTransformBackend>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Detect changes without writing, committing or pushing
    #[arg(long)]
    dry_run: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, colour) = Self::style_for_level(record.level());

            // stdout carries the result lines, so logs always go to stderr
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // The logger accepts everything; log::max_level does the filtering and
    // is raised or lowered once the configuration is loaded
    let _ = CustomLogger::init(LevelFilter::Trace);
    log::set_max_level(LevelFilter::Info);

    let options = match CommandLineOptions::try_parse() {
        Ok(options) => options,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(exit_codes::USAGE as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(options).await {
        Ok(report) => match emit_report(&report) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::from(e.exit_code() as u8)
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn load_config(options: &CommandLineOptions) -> Result<Config, AppError> {
    let mut config = Config::load(options.config_path.as_deref())
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    // Override config with CLI options if provided
    if let Some(threshold) = options.wrap_threshold {
        config.wrap.threshold = threshold;
    }

    if let Some(factor) = options.bracket_factor {
        config.wrap.bracket_factor = factor;
    }

    if let Some(backend) = &options.backend {
        config.transform.backend = backend.clone().into();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

async fn run(options: CommandLineOptions) -> Result<RunReport, AppError> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config = load_config(&options)?;
    log::set_max_level(level_filter(&config.log_level));

    let request = RunRequest {
        source_tree: options.source_tree,
        source_file: options.source_file,
        dest_dir: options.dest_dir,
        tools_dir: options.tools_dir,
        source_ref: options.source_ref,
        wrap: WrapOptions::from(config.wrap),
    };

    let controller = Controller::with_config(config)?.with_dry_run(options.dry_run);
    let report = controller.run(&request).await?;

    match &report.result {
        PublishResult::WouldPublish { paths } => info!("Dry run: {} file(s) would be published", paths.len()),
        result if result.is_published() => info!("Published {} file(s)", result.published_paths().len()),
        _ => {}
    }

    Ok(report)
}

fn emit_report(report: &RunReport) -> Result<(), AppError> {
    let pairs = report.output_pairs();

    let mut stdout = std::io::stdout().lock();
    for (key, value) in &pairs {
        writeln!(stdout, "{}={}", key, value)?;
    }
    stdout.flush()?;

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        FileManager::append_key_values(PathBuf::from(path), &pairs)?;
    }

    Ok(())
}
