//! Run configuration: optional RON file, overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use engine_logging::LogDestination;
use harvester_core::{BackoffPolicy, HarvestSettings, RetryPolicy, DEFAULT_DELAY};
use harvester_engine::ClientSettings;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "harvester.ron";
pub const DEFAULT_LOG_FILE: &str = "harvester.log";

/// Where log lines go. File output uses `log_file`, or `harvester.log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Parser)]
#[command(
    name = "wiki-link-harvester",
    version,
    about = "Collect every external link on a MediaWiki site into a dated text file"
)]
pub struct Args {
    /// API endpoint, usually ending in /api.php.
    #[arg(long)]
    pub api_url: Option<String>,
    /// Bot username in the form user@botname.
    #[arg(long, short)]
    pub username: Option<String>,
    /// Bot password from Special:BotPasswords.
    #[arg(long, env = "HARVESTER_BOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Seconds to wait between batches; failed batches wait twice as long.
    #[arg(long)]
    pub delay: Option<f64>,
    /// Give up after a batch fails this many times in a row (default: retry forever).
    #[arg(long)]
    pub max_consecutive_failures: Option<u32>,
    /// Directory for the links file.
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    #[arg(long, value_enum)]
    pub log: Option<LogTarget>,
    /// Log file used by `--log file` and `--log both`; implies `both` when given alone.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(long, short)]
    pub verbose: bool,
}

/// Contents of the optional `harvester.ron` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub delay_secs: Option<f64>,
    pub max_consecutive_failures: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub log_destination: Option<LogTarget>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("delay must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
    #[error("max consecutive failures must be at least 1")]
    InvalidFailureLimit,
}

/// Fully resolved settings for one run. Values still missing here are prompted for.
///
/// The password is taken out by the prompt step and never outlives the login.
#[derive(Clone)]
pub struct RunConfig {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub harvest: HarvestSettings,
    pub client: ClientSettings,
    pub output_dir: PathBuf,
    pub log_destination: LogDestination,
    pub log_level: LevelFilter,
}

/// Reads the config file; a missing file yields the defaults.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn resolve(args: Args, file: FileConfig) -> Result<RunConfig, ConfigError> {
    let delay = match args.delay.or(file.delay_secs) {
        Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDelay(secs))?,
        None => DEFAULT_DELAY,
    };
    let retry = match args
        .max_consecutive_failures
        .or(file.max_consecutive_failures)
    {
        Some(0) => return Err(ConfigError::InvalidFailureLimit),
        Some(max) => RetryPolicy::MaxConsecutiveFailures(max),
        None => RetryPolicy::Unbounded,
    };

    let mut client = ClientSettings::default();
    if let Some(user_agent) = file.user_agent {
        client.user_agent = user_agent;
    }
    if let Some(secs) = file.request_timeout_secs {
        client.request_timeout = Duration::from_secs(secs);
    }

    let log_file = args.log_file.or(file.log_file);
    let log_target = match args.log.or(file.log_destination) {
        Some(target) => target,
        None if log_file.is_some() => LogTarget::Both,
        None => LogTarget::Terminal,
    };
    let log_path = log_file.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let log_destination = match log_target {
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::File => LogDestination::File(log_path),
        LogTarget::Both => LogDestination::Both(log_path),
    };

    Ok(RunConfig {
        api_url: args.api_url.or(file.api_url),
        username: args.username.or(file.username),
        password: args.password,
        harvest: HarvestSettings {
            backoff: BackoffPolicy::new(delay),
            retry,
        },
        client,
        output_dir: args
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        log_destination,
        log_level: if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wiki-link-harvester").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_file_config(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn reads_ron_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvester.ron");
        fs::write(
            &path,
            r#"(
                api_url: Some("https://wiki.example.org/w/api.php"),
                delay_secs: Some(0.5),
                max_consecutive_failures: Some(10),
            )"#,
        )
        .unwrap();

        let config = load_file_config(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://wiki.example.org/w/api.php"));
        assert_eq!(config.delay_secs, Some(0.5));
        assert_eq!(config.max_consecutive_failures, Some(10));
        assert_eq!(config.username, None);
    }

    #[test]
    fn file_retry_bound_and_log_destination_reach_run_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvester.ron");
        fs::write(
            &path,
            "(max_consecutive_failures: Some(3), log_destination: Some(Both))",
        )
        .unwrap();

        let file = load_file_config(&path).unwrap();
        let config = resolve(parse(&[]), file).unwrap();
        assert_eq!(config.harvest.retry, RetryPolicy::MaxConsecutiveFailures(3));
        assert_eq!(
            config.log_destination,
            LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE))
        );
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvester.ron");
        fs::write(&path, "(max_attempts: Some(3))").unwrap();
        assert!(matches!(load_file_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvester.ron");
        fs::write(&path, "(api_url: ").unwrap();
        assert!(matches!(load_file_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn defaults_match_two_second_pacing_and_unbounded_retry() {
        let config = resolve(parse(&[]), FileConfig::default()).unwrap();
        assert_eq!(config.harvest.backoff.delay(), Duration::from_secs(2));
        assert_eq!(config.harvest.retry, RetryPolicy::Unbounded);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.log_destination, LogDestination::Terminal);
        assert_eq!(config.client.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn file_only_logging_defaults_to_harvester_log() {
        let config = resolve(parse(&["--log", "file"]), FileConfig::default()).unwrap();
        assert_eq!(
            config.log_destination,
            LogDestination::File(PathBuf::from(DEFAULT_LOG_FILE))
        );
    }

    #[test]
    fn log_file_alone_logs_to_both() {
        let file = FileConfig {
            log_file: Some(PathBuf::from("/tmp/run.log")),
            ..FileConfig::default()
        };
        let config = resolve(parse(&[]), file).unwrap();
        assert_eq!(
            config.log_destination,
            LogDestination::Both(PathBuf::from("/tmp/run.log"))
        );
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileConfig {
            api_url: Some("https://file.example/api.php".into()),
            username: Some("FileBot@x".into()),
            delay_secs: Some(5.0),
            max_consecutive_failures: Some(9),
            ..FileConfig::default()
        };
        let args = parse(&[
            "--api-url",
            "https://cli.example/api.php",
            "--delay",
            "0.25",
            "--max-consecutive-failures",
            "4",
        ]);

        let config = resolve(args, file).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://cli.example/api.php"));
        assert_eq!(config.username.as_deref(), Some("FileBot@x"));
        assert_eq!(config.harvest.backoff.delay(), Duration::from_millis(250));
        assert_eq!(config.harvest.retry, RetryPolicy::MaxConsecutiveFailures(4));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let args = parse(&["--delay=-1"]);
        assert!(matches!(
            resolve(args, FileConfig::default()),
            Err(ConfigError::InvalidDelay(_))
        ));
    }

    #[test]
    fn zero_failure_limit_is_rejected() {
        let args = parse(&["--max-consecutive-failures", "0"]);
        assert!(matches!(
            resolve(args, FileConfig::default()),
            Err(ConfigError::InvalidFailureLimit)
        ));
    }
}
