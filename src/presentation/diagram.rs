//! Compiled diagram tables.
//!
//! A [`DiagramTable`] is the static phase → frame table of one presentation
//! consumer, aligned with the sequence indices. Every lookup is a plain
//! index into a vector built once at load time.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::schema::{DiagramSpec, EdgeStyle};
use crate::error::ValidationIssue;
use crate::phase::{Speed, StepSequence};

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Node id
    pub id: Arc<str>,
    /// Display label
    pub label: String,
    /// One-line caption
    pub description: String,
}

/// A directed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Edge id
    pub id: Arc<str>,
    /// Source node id
    pub from: Arc<str>,
    /// Destination node id
    pub to: Arc<str>,
}

/// A highlighted node in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveNode {
    /// Node id
    pub id: Arc<str>,
    /// Display label
    pub label: String,
    /// Accent tone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// A highlighted connection in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveEdge {
    /// Edge id
    pub id: Arc<str>,
    /// Source node id
    pub from: Arc<str>,
    /// Destination node id
    pub to: Arc<str>,
    /// Line style
    pub style: EdgeStyle,
}

/// A one-shot packet animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    /// Source node id
    pub from: Arc<str>,
    /// Destination node id
    pub to: Arc<str>,
    /// Text carried by the packet
    pub label: String,
    /// Travel time
    #[serde(rename = "travel_ms", serialize_with = "as_millis")]
    pub travel: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl Packet {
    /// Copy with travel time scaled to `speed`.
    #[must_use]
    pub fn at_speed(&self, speed: Speed) -> Self {
        Self {
            travel: speed.effective(self.travel),
            ..self.clone()
        }
    }
}

/// The part of a frame that depends only on the phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SteadyFrame {
    /// Phase index
    pub phase: usize,
    /// Phase name
    pub phase_name: Arc<str>,
    /// Highlighted nodes
    pub nodes: Vec<ActiveNode>,
    /// Highlighted connections
    pub edges: Vec<ActiveEdge>,
    /// Status line
    pub status: String,
}

impl SteadyFrame {
    /// Whether `node` is highlighted.
    #[must_use]
    pub fn is_node_active(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| &*n.id == node)
    }

    /// Whether `edge` is highlighted.
    #[must_use]
    pub fn is_edge_active(&self, edge: &str) -> bool {
        self.edges.iter().any(|e| &*e.id == edge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    steady: SteadyFrame,
    packets: Vec<Packet>,
}

/// Static phase → frame table for one diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramTable {
    id: String,
    title: String,
    description: Option<String>,
    nodes: IndexMap<Arc<str>, Node>,
    edges: IndexMap<Arc<str>, Edge>,
    frames: Vec<Frame>,
}

impl DiagramTable {
    /// Compiles a diagram spec against the phase sequence.
    ///
    /// Frames are reordered to follow the sequence. The spec is expected to
    /// have passed validation; the first inconsistency found is still
    /// reported rather than panicking.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationIssue`] for a phase without a frame or a
    /// reference to an unknown node or edge.
    pub fn compile(spec: &DiagramSpec, sequence: &StepSequence) -> Result<Self, ValidationIssue> {
        let nodes: IndexMap<Arc<str>, Node> = spec
            .nodes
            .iter()
            .map(|(id, node)| {
                let id: Arc<str> = Arc::from(id.as_str());
                (
                    Arc::clone(&id),
                    Node {
                        id,
                        label: node.label.clone(),
                        description: node.description.clone(),
                    },
                )
            })
            .collect();

        let node_id = |id: &str, path: &str| {
            nodes
                .get_key_value(id)
                .map(|(k, _)| Arc::clone(k))
                .ok_or_else(|| ValidationIssue::error(path, format!("unknown node '{id}'")))
        };

        let mut edges = IndexMap::with_capacity(spec.edges.len());
        for (id, edge) in &spec.edges {
            let path = format!("{}.edges.{id}", spec.id);
            let id: Arc<str> = Arc::from(id.as_str());
            let compiled = Edge {
                id: Arc::clone(&id),
                from: node_id(&edge.from, &path)?,
                to: node_id(&edge.to, &path)?,
            };
            edges.insert(id, compiled);
        }

        let mut frames = Vec::with_capacity(sequence.len());
        for (index, step) in sequence.iter().enumerate() {
            let path = format!("{}.frames.{}", spec.id, step.name);
            let frame = spec.frames.get(&*step.name).ok_or_else(|| {
                ValidationIssue::error(&path, format!("no frame for phase '{}'", step.name))
            })?;

            let active_nodes = frame
                .nodes
                .iter()
                .map(|active| {
                    let id = node_id(active.node(), &path)?;
                    Ok(ActiveNode {
                        label: nodes[&id].label.clone(),
                        id,
                        tone: active.tone().map(str::to_owned),
                    })
                })
                .collect::<Result<Vec<_>, ValidationIssue>>()?;

            let active_edges = frame
                .edges
                .iter()
                .map(|active| {
                    let edge: &Edge = edges.get(active.edge()).ok_or_else(|| {
                        ValidationIssue::error(&path, format!("unknown edge '{}'", active.edge()))
                    })?;
                    Ok(ActiveEdge {
                        id: Arc::clone(&edge.id),
                        from: Arc::clone(&edge.from),
                        to: Arc::clone(&edge.to),
                        style: active.style(),
                    })
                })
                .collect::<Result<Vec<_>, ValidationIssue>>()?;

            let packets = frame
                .packets
                .iter()
                .map(|packet| {
                    Ok(Packet {
                        from: node_id(&packet.from, &path)?,
                        to: node_id(&packet.to, &path)?,
                        label: packet.label.clone(),
                        travel: packet.travel.get(),
                    })
                })
                .collect::<Result<Vec<_>, ValidationIssue>>()?;

            frames.push(Frame {
                steady: SteadyFrame {
                    phase: index,
                    phase_name: Arc::clone(&step.name),
                    nodes: active_nodes,
                    edges: active_edges,
                    status: frame.status.clone(),
                },
                packets,
            });
        }

        Ok(Self {
            id: spec.id.clone(),
            title: spec.title.clone(),
            description: spec.description.clone(),
            nodes,
            edges,
            frames,
        })
    }

    /// Diagram id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Number of frames (equals the number of phases).
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the table has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Steady-state frame for `phase`.
    #[must_use]
    pub fn steady(&self, phase: usize) -> Option<&SteadyFrame> {
        self.frames.get(phase).map(|f| &f.steady)
    }

    /// Packets that play on entry into `phase`.
    #[must_use]
    pub fn packets(&self, phase: usize) -> &[Packet] {
        self.frames.get(phase).map_or(&[], |f| f.packets.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{
        ActiveEdgeSpec, ActiveNodeSpec, EdgeSpec, FrameSpec, HumanDuration, NodeSpec, PacketSpec,
    };

    fn sequence() -> StepSequence {
        let durations = [("idle", 1000), ("input", 1500)]
            .iter()
            .map(|(n, ms)| ((*n).to_string(), Duration::from_millis(*ms)))
            .collect();
        StepSequence::new(&["idle", "input"], &durations).unwrap()
    }

    fn spec() -> DiagramSpec {
        let mut nodes = IndexMap::new();
        for (id, label) in [("user", "User"), ("db", "Vector DB")] {
            nodes.insert(
                id.to_string(),
                NodeSpec {
                    label: label.to_string(),
                    description: String::new(),
                },
            );
        }
        let mut edges = IndexMap::new();
        edges.insert(
            "query".to_string(),
            EdgeSpec {
                from: "user".to_string(),
                to: "db".to_string(),
            },
        );
        let mut frames = IndexMap::new();
        // Declared out of sequence order on purpose
        frames.insert(
            "input".to_string(),
            FrameSpec {
                nodes: vec![ActiveNodeSpec::Toned {
                    node: "user".to_string(),
                    tone: Some("blue".to_string()),
                }],
                edges: vec![ActiveEdgeSpec::Name("query".to_string())],
                packets: vec![PacketSpec {
                    from: "user".to_string(),
                    to: "db".to_string(),
                    label: "Query".to_string(),
                    travel: HumanDuration::from_millis(1500),
                }],
                status: "User asks".to_string(),
            },
        );
        frames.insert(
            "idle".to_string(),
            FrameSpec {
                status: "Standing by".to_string(),
                ..FrameSpec::default()
            },
        );
        DiagramSpec {
            id: "rag".to_string(),
            title: "RAG".to_string(),
            description: None,
            nodes,
            edges,
            frames,
        }
    }

    #[test]
    fn test_compile_aligns_frames_with_sequence() {
        let table = DiagramTable::compile(&spec(), &sequence()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.steady(0).unwrap().status, "Standing by");
        assert_eq!(&*table.steady(1).unwrap().phase_name, "input");
        assert!(table.steady(2).is_none());
    }

    #[test]
    fn test_steady_frame_contents() {
        let table = DiagramTable::compile(&spec(), &sequence()).unwrap();
        let frame = table.steady(1).unwrap();
        assert!(frame.is_node_active("user"));
        assert!(!frame.is_node_active("db"));
        assert!(frame.is_edge_active("query"));
        assert_eq!(frame.nodes[0].label, "User");
        assert_eq!(frame.nodes[0].tone.as_deref(), Some("blue"));
        assert_eq!(&*frame.edges[0].to, "db");
    }

    #[test]
    fn test_steady_is_a_pure_lookup() {
        let table = DiagramTable::compile(&spec(), &sequence()).unwrap();
        assert_eq!(table.steady(1), table.steady(1));
    }

    #[test]
    fn test_packets_by_phase() {
        let table = DiagramTable::compile(&spec(), &sequence()).unwrap();
        assert!(table.packets(0).is_empty());
        assert_eq!(table.packets(1)[0].label, "Query");
        assert!(table.packets(7).is_empty());
    }

    #[test]
    fn test_packet_at_speed() {
        let table = DiagramTable::compile(&spec(), &sequence()).unwrap();
        let fast = table.packets(1)[0].at_speed(Speed::new(3.0).unwrap());
        assert_eq!(fast.travel, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_frame_is_reported() {
        let mut spec = spec();
        spec.frames.shift_remove("idle");
        let issue = DiagramTable::compile(&spec, &sequence()).unwrap_err();
        assert_eq!(issue.path, "rag.frames.idle");
    }

    #[test]
    fn test_unknown_edge_is_reported() {
        let mut spec = spec();
        spec.frames["input"].edges = vec![ActiveEdgeSpec::Name("answer".to_string())];
        let issue = DiagramTable::compile(&spec, &sequence()).unwrap_err();
        assert!(issue.message.contains("unknown edge 'answer'"));
    }
}
