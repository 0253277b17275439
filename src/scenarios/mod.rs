//! Built-in scenarios
//!
//! Scenario files embedded in the binary at compile time, so
//! `twinstep play` works without any file on disk.

use std::sync::LazyLock;

use crate::config::{ConfigLoader, LoadResult};
use crate::config::validation::did_you_mean;
use crate::error::ConfigError;

/// Name of the scenario played when none is given.
pub const DEFAULT_SCENARIO: &str = "diagnose-system-issue";

/// A built-in scenario embedded in the binary.
#[derive(Debug)]
pub struct BuiltinScenario {
    /// Unique identifier (kebab-case).
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Tags for filtering.
    pub tags: &'static [&'static str],

    /// Raw YAML content.
    pub yaml: &'static str,
}

impl BuiltinScenario {
    /// Loads and compiles this scenario.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the embedded YAML fails to load, which
    /// the registry tests rule out.
    pub fn load(&self, loader: &ConfigLoader) -> Result<LoadResult, ConfigError> {
        loader.load_from_str(self.yaml, format!("builtin:{}", self.name))
    }
}

static BUILTIN_SCENARIOS: LazyLock<Vec<BuiltinScenario>> = LazyLock::new(|| {
    vec![
        BuiltinScenario {
            name: DEFAULT_SCENARIO,
            description: "RAG vs MCP answering 'what is broken right now?'",
            tags: &["rag", "mcp", "comparison"],
            yaml: include_str!("../../scenarios/diagnose-system-issue.yaml"),
        },
        BuiltinScenario {
            name: "minimal",
            description: "Four phases and a single client/service diagram",
            tags: &["minimal", "timing"],
            yaml: include_str!("../../scenarios/minimal.yaml"),
        },
    ]
});

/// All built-in scenarios, optionally filtered by tag.
#[must_use]
pub fn list_scenarios(tag: Option<&str>) -> Vec<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS
        .iter()
        .filter(|s| tag.is_none_or(|t| s.tags.contains(&t)))
        .collect()
}

/// Looks up a built-in scenario by exact name.
#[must_use]
pub fn find_scenario(name: &str) -> Option<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS.iter().find(|s| s.name == name)
}

/// Looks up a built-in scenario, suggesting a close name on a miss.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownScenario`] if no scenario has that name.
pub fn find(name: &str) -> Result<&'static BuiltinScenario, ConfigError> {
    find_scenario(name).ok_or_else(|| ConfigError::UnknownScenario {
        name: name.to_string(),
        suggestion: suggest_scenario(name),
    })
}

/// Closest built-in name within a small edit distance.
#[must_use]
pub fn suggest_scenario(input: &str) -> Option<String> {
    did_you_mean(input, BUILTIN_SCENARIOS.iter().map(|s| s.name))
}

/// All scenario names in registry order.
#[must_use]
pub fn list_scenario_names() -> Vec<&'static str> {
    BUILTIN_SCENARIOS.iter().map(|s| s.name).collect()
}
