//! Scenario file schema
//!
//! Types deserialized from scenario YAML. They are checked by
//! [`Validator`](super::validation::Validator) and then compiled into a
//! [`Scenario`](super::Scenario) by the loader.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Durations
// ============================================================================

/// A duration written as `"1500ms"`, `"1s"`, `"2m"` or a bare integer of
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    /// Wrapped duration.
    #[must_use]
    pub const fn get(self) -> Duration {
        self.0
    }

    /// Milliseconds shorthand.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Self::from_millis(ms)),
            Raw::Text(text) => humantime::parse_duration(text.trim())
                .map(Self)
                .map_err(|e| serde::de::Error::custom(format!("invalid duration '{text}': {e}"))),
        }
    }
}

// ============================================================================
// Top-Level Scenario
// ============================================================================

const fn default_settle() -> HumanDuration {
    HumanDuration::from_millis(1000)
}

const fn default_true() -> bool {
    true
}

/// Root of a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Headline shown above the diagrams
    pub title: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Hold at the terminal phase before looping
    #[serde(default = "default_settle")]
    pub settle: HumanDuration,

    /// Start playing immediately
    #[serde(default = "default_true")]
    pub autoplay: bool,

    /// Speed multiplier settings
    #[serde(default)]
    pub speed: SpeedConfig,

    /// Ordered phase names
    pub steps: Vec<String>,

    /// Nominal duration per phase
    pub durations: IndexMap<String, HumanDuration>,

    /// Diagram tables, one per presentation consumer
    #[serde(default)]
    pub diagrams: Vec<DiagramSpec>,
}

/// Speed multiplier settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedConfig {
    /// Speed at start
    pub initial: f64,
    /// Slowest choice
    pub min: f64,
    /// Fastest choice
    pub max: f64,
    /// Increment between choices
    pub step: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            min: 0.5,
            max: 3.0,
            step: 0.5,
        }
    }
}

// ============================================================================
// Diagrams
// ============================================================================

/// One presentation consumer's static table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramSpec {
    /// Short identifier (e.g. `rag`)
    pub id: String,

    /// Display title
    pub title: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Named nodes
    pub nodes: IndexMap<String, NodeSpec>,

    /// Named directed connections
    #[serde(default)]
    pub edges: IndexMap<String, EdgeSpec>,

    /// One frame per phase, keyed by phase name
    pub frames: IndexMap<String, FrameSpec>,
}

/// A diagram node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Display label
    pub label: String,
    /// One-line caption
    #[serde(default)]
    pub description: String,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeSpec {
    /// Source node id
    pub from: String,
    /// Destination node id
    pub to: String,
}

/// What a diagram shows while one phase is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpec {
    /// Highlighted nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ActiveNodeSpec>,

    /// Highlighted connections
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<ActiveEdgeSpec>,

    /// One-shot packets played on entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packets: Vec<PacketSpec>,

    /// Status line
    #[serde(default)]
    pub status: String,
}

/// A highlighted node: either a bare id or an id with an accent tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveNodeSpec {
    /// `- user`
    Name(String),
    /// `- { node: user, tone: green }`
    Toned {
        /// Node id
        node: String,
        /// Accent tone
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tone: Option<String>,
    },
}

impl ActiveNodeSpec {
    /// Referenced node id.
    #[must_use]
    pub fn node(&self) -> &str {
        match self {
            Self::Name(node) | Self::Toned { node, .. } => node,
        }
    }

    /// Accent tone, if any.
    #[must_use]
    pub fn tone(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Toned { tone, .. } => tone.as_deref(),
        }
    }
}

/// Line style of a highlighted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    /// Continuous line
    #[default]
    Solid,
    /// Dashed line
    Dashed,
}

impl fmt::Display for EdgeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
        })
    }
}

/// A highlighted connection: either a bare id or an id with a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveEdgeSpec {
    /// `- query`
    Name(String),
    /// `- { edge: query, style: dashed }`
    Styled {
        /// Edge id
        edge: String,
        /// Line style
        #[serde(default)]
        style: EdgeStyle,
    },
}

impl ActiveEdgeSpec {
    /// Referenced edge id.
    #[must_use]
    pub fn edge(&self) -> &str {
        match self {
            Self::Name(edge) | Self::Styled { edge, .. } => edge,
        }
    }

    /// Line style (solid unless stated).
    #[must_use]
    pub const fn style(&self) -> EdgeStyle {
        match self {
            Self::Name(_) => EdgeStyle::Solid,
            Self::Styled { style, .. } => *style,
        }
    }
}

const fn default_travel() -> HumanDuration {
    HumanDuration::from_millis(1500)
}

/// A one-shot packet animation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketSpec {
    /// Source node id
    pub from: String,
    /// Destination node id
    pub to: String,
    /// Text carried by the packet
    pub label: String,
    /// Travel time at 1x
    #[serde(default = "default_travel")]
    pub travel: HumanDuration,
}
