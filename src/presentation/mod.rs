//! Presentation consumers
//!
//! Static diagram tables compiled from scenario files, the consumer that
//! maps sequencer snapshots onto them, and the renderers that draw the
//! result. Consumers only ever hold a read-only snapshot receiver.

pub mod consumer;
pub mod diagram;
pub mod render;

pub use consumer::{Consumer, View, spawn_consumer};
pub use diagram::{ActiveEdge, ActiveNode, DiagramTable, Edge, Node, Packet, SteadyFrame};
pub use render::{JsonRenderer, Renderer, TextRenderer};
