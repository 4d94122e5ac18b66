//! Command-line interface parsing for enrollq
//!
//! This module handles parsing of CLI arguments using clap, turning them into
//! a validated `EngineConfig`, and interpreting the lines typed at the
//! interactive prompt.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::engine::{RefreshPolicy, DEFAULT_MIN_SUCCESS_RATIO};
use crate::fetch::portal::{PortalConfig, DEFAULT_BASE_URL, DEFAULT_EXAM_TYPE};

/// Input that ends the interactive loop (case-insensitive)
const EXIT_COMMAND: &str = "exit";

/// Error types for CLI arguments and prompt input
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// The typed text is not an exam number
    #[error("Invalid input: '{0}'. Please enter a valid exam number.")]
    InvalidInput(String),

    /// The success ratio is outside 0..=1
    #[error("Invalid success ratio: {0}. Expected a value between 0 and 1")]
    InvalidSuccessRatio(f64),

    /// A timeout of zero would fail every request
    #[error("Timeout must be at least one second")]
    ZeroTimeout,
}

/// enrollq - Check admission and waitlist positions on the enrollment board
#[derive(Parser, Debug)]
#[command(name = "enrollq")]
#[command(about = "Admission and waitlist position lookup for the NYCU enrollment board")]
#[command(version)]
pub struct Cli {
    /// Exam numbers to look up once, then exit
    ///
    /// Without any, enrollq prompts for exam numbers until 'exit'.
    #[arg(value_name = "EXAM_NUMBER")]
    pub exam_numbers: Vec<String>,

    /// Directory for the cached snapshot (defaults to the user cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Landing page of the enrollment board
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Exam type option to track
    #[arg(long, value_name = "ID", default_value = DEFAULT_EXAM_TYPE)]
    pub exam_type: String,

    /// Refresh the snapshot when it is older than this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub max_age_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 20)]
    pub timeout_secs: u64,

    /// Share of departments (0 to 1) that must be read for a refresh to count as fresh
    #[arg(long, value_name = "RATIO", default_value_t = DEFAULT_MIN_SUCCESS_RATIO)]
    pub min_success_ratio: f64,

    /// Refresh the snapshot before answering, even if it is still fresh
    #[arg(long)]
    pub refresh: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Custom snapshot directory, if given
    pub cache_dir: Option<PathBuf>,
    /// Where and what to fetch
    pub portal: PortalConfig,
    /// When to refresh
    pub policy: RefreshPolicy,
    /// Whether to refresh before the first answer
    pub force_refresh: bool,
    /// Exam numbers for batch mode; empty means interactive
    pub exam_numbers: Vec<String>,
}

impl EngineConfig {
    /// Creates an EngineConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(EngineConfig)` with validated settings
    /// * `Err(CliError)` if a value is out of range or an exam number is malformed
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !(0.0..=1.0).contains(&cli.min_success_ratio) {
            return Err(CliError::InvalidSuccessRatio(cli.min_success_ratio));
        }
        if cli.timeout_secs == 0 {
            return Err(CliError::ZeroTimeout);
        }
        let exam_numbers = cli
            .exam_numbers
            .iter()
            .map(|exam| parse_exam_number(exam))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EngineConfig {
            cache_dir: cli.cache_dir.clone(),
            portal: PortalConfig {
                base_url: cli.base_url.clone(),
                exam_type: cli.exam_type.clone(),
                timeout: Duration::from_secs(cli.timeout_secs),
            },
            policy: RefreshPolicy {
                max_age: Duration::from_secs(cli.max_age_secs),
                min_success_ratio: cli.min_success_ratio,
            },
            force_refresh: cli.refresh,
            exam_numbers,
        })
    }
}

/// What a line typed at the prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Leave the loop
    Exit,
    /// Blank line, prompt again
    Empty,
    /// Look up this exam number
    Query(String),
}

impl InputCommand {
    /// Interprets one prompt line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, CliError> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(InputCommand::Empty);
        }
        if input.eq_ignore_ascii_case(EXIT_COMMAND) {
            return Ok(InputCommand::Exit);
        }
        parse_exam_number(input).map(InputCommand::Query)
    }
}

/// Accepts non-empty ASCII alphanumeric text, unchanged.
///
/// No other normalization happens: leading zeros are significant.
pub fn parse_exam_number(s: &str) -> Result<String, CliError> {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidInput(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_exit_is_case_insensitive() {
        assert_eq!(InputCommand::parse("exit").unwrap(), InputCommand::Exit);
        assert_eq!(InputCommand::parse("EXIT\n").unwrap(), InputCommand::Exit);
        assert_eq!(InputCommand::parse("  Exit ").unwrap(), InputCommand::Exit);
    }

    #[test]
    fn test_input_blank_line_is_empty() {
        assert_eq!(InputCommand::parse("").unwrap(), InputCommand::Empty);
        assert_eq!(InputCommand::parse("   \n").unwrap(), InputCommand::Empty);
    }

    #[test]
    fn test_input_exam_number_is_trimmed_only() {
        assert_eq!(
            InputCommand::parse(" 3001540\n").unwrap(),
            InputCommand::Query("3001540".to_string())
        );
        assert_eq!(
            InputCommand::parse("03001540").unwrap(),
            InputCommand::Query("03001540".to_string())
        );
    }

    #[test]
    fn test_input_invalid() {
        let err = InputCommand::parse("30015 40").unwrap_err();
        assert_eq!(err, CliError::InvalidInput("30015 40".to_string()));
        assert!(err.to_string().contains("Invalid input"));

        assert!(InputCommand::parse("exit;").is_err());
        assert!(InputCommand::parse("考生").is_err());
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["enrollq"]);
        assert!(cli.exam_numbers.is_empty());
        assert!(cli.cache_dir.is_none());
        assert!(!cli.refresh);
        assert_eq!(cli.max_age_secs, 300);
        assert_eq!(cli.timeout_secs, 20);
    }

    #[test]
    fn test_cli_parse_batch_numbers() {
        let cli = Cli::parse_from(["enrollq", "3001540", "3001541"]);
        assert_eq!(cli.exam_numbers, vec!["3001540", "3001541"]);
    }

    #[test]
    fn test_engine_config_defaults() {
        let cli = Cli::parse_from(["enrollq"]);
        let config = EngineConfig::from_cli(&cli).unwrap();

        assert_eq!(config.portal, PortalConfig::default());
        assert_eq!(config.policy, RefreshPolicy::default());
        assert!(!config.force_refresh);
        assert!(config.exam_numbers.is_empty());
    }

    #[test]
    fn test_engine_config_from_flags() {
        let cli = Cli::parse_from([
            "enrollq",
            "--cache-dir",
            "/tmp/enrollq",
            "--base-url",
            "http://localhost:8080/",
            "--max-age-secs",
            "60",
            "--timeout-secs",
            "5",
            "--min-success-ratio",
            "0",
            "--refresh",
            "3001540",
        ]);
        let config = EngineConfig::from_cli(&cli).unwrap();

        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/enrollq")));
        assert_eq!(config.portal.base_url, "http://localhost:8080/");
        assert_eq!(config.portal.timeout, Duration::from_secs(5));
        assert_eq!(config.policy.max_age, Duration::from_secs(60));
        assert_eq!(config.policy.min_success_ratio, 0.0);
        assert!(config.force_refresh);
        assert_eq!(config.exam_numbers, vec!["3001540".to_string()]);
    }

    #[test]
    fn test_engine_config_rejects_bad_ratio() {
        let cli = Cli::parse_from(["enrollq", "--min-success-ratio", "1.5"]);
        assert_eq!(
            EngineConfig::from_cli(&cli),
            Err(CliError::InvalidSuccessRatio(1.5))
        );
    }

    #[test]
    fn test_engine_config_rejects_zero_timeout() {
        let cli = Cli::parse_from(["enrollq", "--timeout-secs", "0"]);
        assert_eq!(EngineConfig::from_cli(&cli), Err(CliError::ZeroTimeout));
    }

    #[test]
    fn test_engine_config_rejects_bad_batch_number() {
        let cli = Cli::parse_from(["enrollq", "3001540", "abc-1"]);
        assert_eq!(
            EngineConfig::from_cli(&cli),
            Err(CliError::InvalidInput("abc-1".to_string()))
        );
    }
}
