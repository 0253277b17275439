//! Scenario configuration
//!
//! Loading, validation and compilation of scenario files: the phase list,
//! the duration table, speed settings, and one diagram table per
//! presentation consumer.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::error::{ConfigError, ValidationIssue};
use crate::phase::{SequencerConfig, Speed, SpeedRange, StepSequence};
use crate::presentation::DiagramTable;

/// A validated, compiled scenario.
///
/// The sequence and every diagram table are built from the same phase list,
/// so each table has exactly one frame per phase.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Headline
    pub title: String,
    /// Free-form description
    pub description: Option<String>,
    /// Phases with their nominal durations
    pub sequence: Arc<StepSequence>,
    /// Hold at the terminal phase before looping
    pub settle: Duration,
    /// Admissible speeds
    pub speed_range: SpeedRange,
    /// Speed at start, already admitted into the range
    pub initial_speed: Speed,
    /// Start playing immediately
    pub autoplay: bool,
    /// One table per presentation consumer
    pub diagrams: Vec<Arc<DiagramTable>>,
}

impl Scenario {
    /// Compiles a validated scenario file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the file is inconsistent.
    /// This only happens for input that skipped [`Validator`].
    pub fn compile(config: &ScenarioConfig, origin: &Path) -> Result<Self, ConfigError> {
        let fail = |issue: ValidationIssue| ConfigError::ValidationError {
            path: origin.display().to_string(),
            errors: vec![issue],
        };

        let durations: IndexMap<String, Duration> = config
            .durations
            .iter()
            .map(|(name, d)| (name.clone(), d.get()))
            .collect();
        let sequence = StepSequence::new(&config.steps, &durations)
            .map_err(|e| fail(ValidationIssue::error("steps", e.to_string())))?;

        let speed = &config.speed;
        let speed_range = SpeedRange::new(speed.min, speed.max, speed.step)
            .map_err(|e| fail(ValidationIssue::error("speed", e.to_string())))?;
        let initial_speed = speed_range
            .admit(speed.initial)
            .map_err(|e| fail(ValidationIssue::error("speed.initial", e.to_string())))?;

        let diagrams = config
            .diagrams
            .iter()
            .map(|spec| DiagramTable::compile(spec, &sequence).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail)?;

        Ok(Self {
            title: config.title.clone(),
            description: config.description.clone(),
            sequence: Arc::new(sequence),
            settle: config.settle.get(),
            speed_range,
            initial_speed,
            autoplay: config.autoplay,
            diagrams,
        })
    }

    /// Driver settings for this scenario.
    #[must_use]
    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            sequence: Arc::clone(&self.sequence),
            settle: self.settle,
            speed_range: self.speed_range,
            initial_speed: self.initial_speed,
            autoplay: self.autoplay,
            max_cycles: None,
        }
    }

    /// Diagram table by id.
    #[must_use]
    pub fn diagram(&self, id: &str) -> Option<&Arc<DiagramTable>> {
        self.diagrams.iter().find(|d| d.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_clamps_initial_speed() {
        let config: ScenarioConfig = serde_yaml::from_str(
            r"
title: Fast
speed: { initial: 10 }
steps: [only]
durations: { only: 1s }
",
        )
        .unwrap();
        let scenario = Scenario::compile(&config, Path::new("fast.yaml")).unwrap();
        assert_eq!(scenario.initial_speed.get(), 3.0);
        assert!(scenario.diagrams.is_empty());
    }

    #[test]
    fn test_compile_reports_unvalidated_input() {
        let config: ScenarioConfig = serde_yaml::from_str(
            r"
title: Broken
steps: [a]
durations: { b: 1s }
",
        )
        .unwrap();
        let err = Scenario::compile(&config, Path::new("broken.yaml")).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_sequencer_config() {
        let config: ScenarioConfig = serde_yaml::from_str(
            r"
title: Paused
autoplay: false
settle: 2s
steps: [a, b]
durations: { a: 1s, b: 1s }
",
        )
        .unwrap();
        let scenario = Scenario::compile(&config, Path::new("p.yaml")).unwrap();
        let seq = scenario.sequencer_config();
        assert!(!seq.autoplay);
        assert_eq!(seq.settle, Duration::from_secs(2));
        assert_eq!(seq.sequence.len(), 2);
        assert_eq!(seq.max_cycles, None);
    }
}
