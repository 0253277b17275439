//! Scenario loader
//!
//! The loading pipeline:
//! 1. Size check against [`ConfigLimits::max_config_size`]
//! 2. YAML parsing into [`ScenarioConfig`]
//! 3. Collect-all validation
//! 4. Compilation into a [`Scenario`], frozen behind an `Arc`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Scenario;
use crate::config::schema::ScenarioConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Limits that keep a scenario file from exhausting resources.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of phases.
    pub max_phases: usize,

    /// Maximum number of diagrams.
    pub max_diagrams: usize,

    /// Maximum scenario file size in bytes.
    pub max_config_size: u64,

    /// Longest accepted phase duration or settle hold.
    pub max_duration: Duration,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_phases: env_or("TWINSTEP_MAX_PHASES", 256),
            max_diagrams: env_or("TWINSTEP_MAX_DIAGRAMS", 16),
            max_config_size: env_or("TWINSTEP_MAX_CONFIG_SIZE", 1024 * 1024),
            max_duration: env_or(
                "TWINSTEP_MAX_DURATION",
                humantime::Duration::from(Duration::from_secs(3600)),
            )
            .into(),
        }
    }
}

/// Options for the scenario loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Size and count limits.
    pub limits: ConfigLimits,
}

/// A loaded scenario plus the warnings found while validating it.
#[derive(Debug)]
pub struct LoadResult {
    /// The compiled scenario.
    pub scenario: Arc<Scenario>,

    /// Validation warnings (do not prevent loading).
    pub warnings: Vec<ValidationIssue>,
}

/// Scenario loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, the YAML does
    /// not parse, or validation reports any error.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.limits.max_config_size;
        if metadata.len() > limit {
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_from_str(&raw, path)
    }

    /// Loads a scenario from YAML text. `origin` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not parse or validation reports
    /// any error.
    pub fn load_from_str(
        &self,
        source: &str,
        origin: impl AsRef<Path>,
    ) -> Result<LoadResult, ConfigError> {
        let origin = origin.as_ref();
        let config = parse(source, origin)?;

        let mut validator = Validator::new();
        let result = validator.validate(&config, &self.options.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }
        for issue in &result.warnings {
            debug!(origin = %origin.display(), path = %issue.path, "{}", issue.message);
        }

        let scenario = Scenario::compile(&config, origin)?;
        debug!(
            origin = %origin.display(),
            title = %scenario.title,
            phases = scenario.sequence.len(),
            diagrams = scenario.diagrams.len(),
            "scenario loaded"
        );

        Ok(LoadResult {
            scenario: Arc::new(scenario),
            warnings: result.warnings,
        })
    }
}

/// Parses YAML text into the raw schema without validating it.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] for empty input or malformed YAML.
pub fn parse(source: &str, origin: &Path) -> Result<ScenarioConfig, ConfigError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    if source.trim().is_empty() {
        return Err(ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: None,
            message: "scenario file is empty".to_string(),
        });
    }
    serde_yaml::from_str(source).map_err(|e| ConfigError::ParseError {
        path: origin.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SCENARIO: &str = r"
title: Demo
settle: 500ms
steps: [idle, input]
durations: { idle: 1s, input: 2s }
diagrams:
  - id: rag
    title: RAG
    nodes: { user: { label: User } }
    frames:
      idle: { status: Standing by }
      input: { nodes: [user], status: User asks }
";

    #[test]
    fn test_load_from_str() {
        let result = ConfigLoader::with_defaults()
            .load_from_str(SCENARIO, "demo.yaml")
            .unwrap();
        let scenario = &result.scenario;
        assert_eq!(scenario.title, "Demo");
        assert_eq!(scenario.settle, Duration::from_millis(500));
        assert_eq!(scenario.sequence.len(), 2);
        assert_eq!(scenario.diagrams[0].id(), "rag");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(result.scenario.sequence.name(1), "input");
    }

    #[test]
    fn test_bom_is_stripped() {
        let source = format!("\u{feff}{SCENARIO}");
        assert!(ConfigLoader::with_defaults().load_from_str(&source, "bom.yaml").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/nonexistent/scenario.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_file_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let loader = ConfigLoader::new(LoaderOptions {
            limits: ConfigLimits {
                max_config_size: 16,
                ..ConfigLimits::default()
            },
        });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileTooLarge { limit: 16, .. }));
    }

    #[test]
    fn test_empty_source() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("  \n", "empty.yaml")
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("title: [unclosed\nsteps: x", "bad.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { line: Some(_), .. }));
    }

    #[test]
    fn test_validation_errors_prevent_loading() {
        let source = SCENARIO.replace("input: 2s", "inptu: 2s");
        let err = ConfigLoader::with_defaults()
            .load_from_str(&source, "typo.yaml")
            .unwrap_err();
        match err {
            ConfigError::ValidationError { path, errors } => {
                assert_eq!(path, "typo.yaml");
                assert!(errors.len() >= 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_warnings_are_returned() {
        let source = SCENARIO.replace("status: Standing by", "status: ''");
        let result = ConfigLoader::with_defaults()
            .load_from_str(&source, "warn.yaml")
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
    }
}
