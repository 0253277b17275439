//! Error types for `twinstep`
//!
//! A single top-level error aggregates the configuration, sequencer and
//! control-surface failures, and maps each of them onto a process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `twinstep` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Sequencer error (invalid speed, driver stopped)
    pub const SEQUENCER_ERROR: i32 = 5;

    /// Usage error (invalid arguments, unknown control command)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `twinstep` operations.
#[derive(Debug, Error)]
pub enum TwinstepError {
    /// Scenario loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sequencer error
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    /// Control surface error
    #[error(transparent)]
    Control(#[from] ControlError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line usage
    #[error("{0}")]
    Usage(String),
}

impl TwinstepError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Sequencer(_) => ExitCode::SEQUENCER_ERROR,
            Self::Control(_) | Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Scenario loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path (or built-in name) of the scenario
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Scenario validation failed
    #[error("validation failed for {path}: {}", summarize(errors))]
    ValidationError {
        /// Path (or built-in name) of the scenario
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Scenario file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Scenario file exceeds the configured size limit
    #[error("file too large: {path} is {size} bytes (limit: {limit})")]
    FileTooLarge {
        /// Path to the file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// No built-in scenario with the requested name
    #[error("unknown scenario '{name}'{}", suggest(suggestion.as_deref()))]
    UnknownScenario {
        /// Requested name
        name: String,
        /// Closest known name, if any
        suggestion: Option<String>,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

fn suggest(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during scenario validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "diagrams[0].frames.action")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an error-level issue.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-level issue.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents the scenario from being used
    Error,
    /// Warning - potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Sequencer Errors
// ============================================================================

/// Step sequence and sequencer driver errors.
#[derive(Debug, Error, PartialEq)]
pub enum SequencerError {
    /// The phase list is empty
    #[error("phase sequence is empty")]
    EmptySequence,

    /// A phase name appears more than once in the sequence
    #[error("phase '{0}' appears more than once in the sequence")]
    DuplicatePhase(String),

    /// A phase in the sequence has no duration entry
    #[error("phase '{0}' has no duration entry")]
    UnmappedPhase(String),

    /// A duration entry names a phase that is not in the sequence
    #[error("duration entry '{0}' does not name a phase in the sequence")]
    UnknownPhase(String),

    /// A phase has a zero nominal duration
    #[error("phase '{0}' has a zero duration")]
    ZeroDuration(String),

    /// Speed multiplier is non-finite or not positive
    #[error("invalid speed multiplier: {0} (must be a positive number)")]
    InvalidSpeed(f64),

    /// Speed range bounds are inconsistent
    #[error("invalid speed range: {0}")]
    InvalidRange(String),

    /// The sequencer driver is no longer running
    #[error("sequencer is not running")]
    Stopped,
}

// ============================================================================
// Control Errors
// ============================================================================

/// Control-surface input errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// The input line contained no command
    #[error("empty command")]
    Empty,

    /// The command word is not recognised
    #[error("unknown command '{input}'{}", suggest(suggestion.as_deref()))]
    UnknownCommand {
        /// The word that was typed
        input: String,
        /// Closest known command, if any
        suggestion: Option<String>,
    },

    /// A command argument could not be parsed
    #[error("invalid argument for '{command}': {message}")]
    InvalidArgument {
        /// The command being parsed
        command: String,
        /// What went wrong
        message: String,
    },

    /// The line could not be tokenized (e.g. unbalanced quotes)
    #[error("could not tokenize input: {0}")]
    Tokenize(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `twinstep` operations.
pub type Result<T> = std::result::Result<T, TwinstepError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SEQUENCER_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_sequencer_error_exit_code() {
        let err: TwinstepError = SequencerError::InvalidSpeed(0.0).into();
        assert_eq!(err.exit_code(), ExitCode::SEQUENCER_ERROR);
    }

    #[test]
    fn test_control_error_exit_code() {
        let err: TwinstepError = ControlError::Empty.into();
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
    }

    #[test]
    fn test_usage_error_exit_code() {
        let err = TwinstepError::Usage("unknown diagram 'x'".to_string());
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
        assert_eq!(err.to_string(), "unknown diagram 'x'");
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: TwinstepError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: TwinstepError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue::error("diagrams[0].frames", "missing frame for 'action'");
        assert_eq!(
            issue.to_string(),
            "error: missing frame for 'action' at diagrams[0].frames"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue::warning("diagrams[1].nodes.files", "node is never active");
        assert_eq!(
            issue.to_string(),
            "warning: node is never active at diagrams[1].nodes.files"
        );
    }

    #[test]
    fn test_validation_error_summarizes_issues() {
        let err = ConfigError::ValidationError {
            path: "scenario.yaml".to_string(),
            errors: vec![
                ValidationIssue::error("steps", "sequence is empty"),
                ValidationIssue::error("durations.idle", "zero duration"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("scenario.yaml"));
        assert!(msg.contains("sequence is empty"));
        assert!(msg.contains("and 1 more"));
    }

    #[test]
    fn test_unknown_scenario_suggestion() {
        let err = ConfigError::UnknownScenario {
            name: "minimall".to_string(),
            suggestion: Some("minimal".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown scenario 'minimall' (did you mean 'minimal'?)"
        );
    }

    #[test]
    fn test_unknown_command_without_suggestion() {
        let err = ControlError::UnknownCommand {
            input: "xyzzy".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown command 'xyzzy'");
    }
}
