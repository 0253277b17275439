//! Scenario validation
//!
//! Semantic checks on a deserialized [`ScenarioConfig`]. Validation collects
//! every error and warning instead of stopping at the first one, so a
//! scenario author sees the whole list in one run.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::loader::ConfigLimits;
use crate::config::schema::{DiagramSpec, ScenarioConfig};
use crate::error::ValidationIssue;
use crate::phase::SpeedRange;

// ============================================================================
// Public API
// ============================================================================

/// Result of scenario validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scenario validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a scenario and returns every issue found.
    pub fn validate(&mut self, config: &ScenarioConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_metadata(config, limits);
        self.validate_steps(config, limits);
        self.validate_speed(config);

        let steps: Vec<&str> = config.steps.iter().map(String::as_str).collect();
        self.validate_diagrams(config, &steps, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Top Level
    // ========================================================================

    fn validate_metadata(&mut self, config: &ScenarioConfig, limits: &ConfigLimits) {
        if config.title.trim().is_empty() {
            self.add_error("title", "title is required and cannot be empty");
        }
        if config.settle.get().is_zero() {
            self.add_warning("settle", "settle is zero; the terminal phase is not held");
        }
        if config.settle.get() > limits.max_duration {
            self.add_error("settle", too_long("settle", limits.max_duration));
        }
    }

    fn validate_steps(&mut self, config: &ScenarioConfig, limits: &ConfigLimits) {
        if config.steps.is_empty() {
            self.add_error("steps", "at least one phase is required");
        }
        if config.steps.len() > limits.max_phases {
            self.add_error(
                "steps",
                format!(
                    "{} phases exceeds the limit of {}",
                    config.steps.len(),
                    limits.max_phases
                ),
            );
        }

        let mut seen = HashSet::new();
        for (i, step) in config.steps.iter().enumerate() {
            let path = format!("steps[{i}]");
            if step.trim().is_empty() {
                self.add_error(&path, "phase name cannot be empty");
            }
            if !seen.insert(step.as_str()) {
                self.add_error(&path, format!("phase '{step}' appears more than once"));
            }
            match config.durations.get(step) {
                None => self.add_error(
                    format!("durations.{step}"),
                    format!("phase '{step}' has no duration"),
                ),
                Some(d) if d.get().is_zero() => self.add_error(
                    format!("durations.{step}"),
                    format!("phase '{step}' has a zero duration"),
                ),
                Some(d) if d.get() > limits.max_duration => self.add_error(
                    format!("durations.{step}"),
                    too_long(&format!("phase '{step}'"), limits.max_duration),
                ),
                Some(_) => {}
            }
        }

        for name in config.durations.keys() {
            if !seen.contains(name.as_str()) {
                let message = with_suggestion(
                    format!("duration given for '{name}', which is not a phase"),
                    did_you_mean(name, config.steps.iter().map(String::as_str)),
                );
                self.add_error(format!("durations.{name}"), message);
            }
        }
    }

    fn validate_speed(&mut self, config: &ScenarioConfig) {
        let speed = &config.speed;
        let range = SpeedRange {
            min: speed.min,
            max: speed.max,
            step: speed.step,
        };
        let range_ok = match range.check() {
            Ok(()) => true,
            Err(e) => {
                self.add_error("speed", e.to_string());
                false
            }
        };

        if !speed.initial.is_finite() || speed.initial <= 0.0 {
            self.add_error(
                "speed.initial",
                format!("initial speed must be positive, got {}", speed.initial),
            );
        } else if range_ok && !range.contains(speed.initial) {
            self.add_warning(
                "speed.initial",
                format!(
                    "initial speed {} is outside [{}, {}] and will be clamped",
                    speed.initial, speed.min, speed.max
                ),
            );
        }
    }

    // ========================================================================
    // Diagrams
    // ========================================================================

    fn validate_diagrams(&mut self, config: &ScenarioConfig, steps: &[&str], limits: &ConfigLimits) {
        if config.diagrams.is_empty() {
            self.add_warning("diagrams", "no diagrams defined; playback renders nothing");
        }
        if config.diagrams.len() > limits.max_diagrams {
            self.add_error(
                "diagrams",
                format!(
                    "{} diagrams exceeds the limit of {}",
                    config.diagrams.len(),
                    limits.max_diagrams
                ),
            );
        }

        let mut ids = HashSet::new();
        for (i, diagram) in config.diagrams.iter().enumerate() {
            let base = format!("diagrams[{i}]");
            if diagram.id.trim().is_empty() {
                self.add_error(format!("{base}.id"), "diagram id cannot be empty");
            }
            if !ids.insert(diagram.id.as_str()) {
                self.add_error(
                    format!("{base}.id"),
                    format!("diagram id '{}' is used more than once", diagram.id),
                );
            }
            self.validate_diagram(diagram, &base, steps);
        }
    }

    fn validate_diagram(&mut self, diagram: &DiagramSpec, base: &str, steps: &[&str]) {
        let node_ids = || diagram.nodes.keys().map(String::as_str);
        let edge_ids = || diagram.edges.keys().map(String::as_str);

        if diagram.nodes.is_empty() {
            self.add_error(format!("{base}.nodes"), "a diagram needs at least one node");
        }

        for (id, edge) in &diagram.edges {
            let path = format!("{base}.edges.{id}");
            for end in [&edge.from, &edge.to] {
                if !diagram.nodes.contains_key(end) {
                    self.unknown_ref(&path, "node", end, node_ids());
                }
            }
        }

        for step in steps {
            if !diagram.frames.contains_key(*step) {
                self.add_error(
                    format!("{base}.frames"),
                    format!("no frame for phase '{step}'"),
                );
            }
        }

        let mut ever_active: HashSet<&str> = HashSet::new();
        for (name, frame) in &diagram.frames {
            let path = format!("{base}.frames.{name}");
            if !steps.contains(&name.as_str()) {
                self.unknown_ref(&path, "phase", name, steps.iter().copied());
            }

            for node in &frame.nodes {
                if diagram.nodes.contains_key(node.node()) {
                    ever_active.insert(node.node());
                } else {
                    self.unknown_ref(&format!("{path}.nodes"), "node", node.node(), node_ids());
                }
            }

            for edge in &frame.edges {
                if !diagram.edges.contains_key(edge.edge()) {
                    self.unknown_ref(&format!("{path}.edges"), "edge", edge.edge(), edge_ids());
                }
            }

            for (j, packet) in frame.packets.iter().enumerate() {
                let packet_path = format!("{path}.packets[{j}]");
                for end in [&packet.from, &packet.to] {
                    if !diagram.nodes.contains_key(end) {
                        self.unknown_ref(&packet_path, "node", end, node_ids());
                    }
                }
                if packet.travel.get().is_zero() {
                    self.add_warning(&packet_path, "packet travel time is zero");
                }
            }

            if frame.status.trim().is_empty() {
                self.add_warning(format!("{path}.status"), "status line is empty");
            }
        }

        for id in node_ids() {
            if !ever_active.contains(id) {
                self.add_warning(
                    format!("{base}.nodes.{id}"),
                    format!("node '{id}' is never active"),
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn unknown_ref<'a>(
        &mut self,
        path: &str,
        kind: &str,
        name: &str,
        candidates: impl Iterator<Item = &'a str>,
    ) {
        let message = with_suggestion(
            format!("unknown {kind} '{name}'"),
            did_you_mean(name, candidates),
        );
        self.add_error(path, message);
    }

    fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::error(path, message));
    }

    fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::warning(path, message));
    }
}

/// Closest candidate within a Damerau-Levenshtein distance of 3.
#[must_use]
pub fn did_you_mean<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|c| (c, strsim::damerau_levenshtein(input, c)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c.to_string())
}

fn too_long(what: &str, max: Duration) -> String {
    format!(
        "{what} exceeds the limit of {}",
        humantime::format_duration(max)
    )
}

fn with_suggestion(message: String, suggestion: Option<String>) -> String {
    match suggestion {
        Some(s) => format!("{message} (did you mean '{s}'?)"),
        None => message,
    }
}
