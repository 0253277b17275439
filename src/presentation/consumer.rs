//! Presentation consumers.
//!
//! A [`Consumer`] turns sequencer snapshots into [`View`]s for one diagram.
//! The steady part of a view is a table lookup on the phase index. Packets
//! are attached only the first time a given phase entry is observed, so a
//! held phase never replays its one-shot animations.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::phase::{Snapshot, Speed};

use super::diagram::{DiagramTable, Packet, SteadyFrame};
use super::render::Renderer;

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    /// Diagram id
    pub diagram: String,
    /// Diagram title
    pub title: String,
    /// Number of phases
    pub phases: usize,
    /// Play flag (cosmetic)
    pub playing: bool,
    /// Speed multiplier (cosmetic)
    pub speed: Speed,
    /// Phase entry counter
    pub entry: u64,
    /// Phase-determined state
    pub steady: SteadyFrame,
    /// One-shot packets for a fresh phase entry
    pub packets: Vec<Packet>,
}

/// Maps snapshots to views for one diagram table.
#[derive(Debug, Clone)]
pub struct Consumer {
    table: Arc<DiagramTable>,
    sync_packets: bool,
    last_entry: Option<u64>,
}

impl Consumer {
    /// Creates a consumer over `table`. Packet travel times are nominal.
    #[must_use]
    pub const fn new(table: Arc<DiagramTable>) -> Self {
        Self {
            table,
            sync_packets: false,
            last_entry: None,
        }
    }

    /// Divide packet travel times by the current speed.
    #[must_use]
    pub const fn with_sync_packets(mut self, sync: bool) -> Self {
        self.sync_packets = sync;
        self
    }

    /// The diagram table.
    #[must_use]
    pub const fn table(&self) -> &Arc<DiagramTable> {
        &self.table
    }

    /// Computes the view for `snapshot`.
    ///
    /// Returns `None` only if the phase index lies outside the table, which
    /// compilation rules out for tables built against the same sequence.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Option<View> {
        let Some(steady) = self.table.steady(snapshot.phase) else {
            warn!(
                diagram = self.table.id(),
                phase = snapshot.phase,
                "no frame for phase"
            );
            return None;
        };

        let fresh = self.last_entry != Some(snapshot.entry);
        self.last_entry = Some(snapshot.entry);

        let packets = if fresh {
            self.table
                .packets(snapshot.phase)
                .iter()
                .map(|p| {
                    if self.sync_packets {
                        p.at_speed(snapshot.speed)
                    } else {
                        p.clone()
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(View {
            diagram: self.table.id().to_owned(),
            title: self.table.title().to_owned(),
            phases: self.table.len(),
            playing: snapshot.playing,
            speed: snapshot.speed,
            entry: snapshot.entry,
            steady: steady.clone(),
            packets,
        })
    }
}

/// Runs `consumer` on its own task, rendering every published snapshot
/// (the current one first) until `cancel` fires or the sequencer goes away.
pub fn spawn_consumer<R>(
    mut consumer: Consumer,
    snapshots: watch::Receiver<Snapshot>,
    mut renderer: R,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: Renderer + 'static,
{
    tokio::spawn(async move {
        let mut stream = WatchStream::new(snapshots);
        loop {
            let snapshot = tokio::select! {
                () = cancel.cancelled() => break,
                next = stream.next() => match next {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            let Some(view) = consumer.observe(&snapshot) else {
                continue;
            };
            if let Err(e) = renderer.render(&view) {
                warn!(diagram = consumer.table().id(), error = %e, "render failed; stopping consumer");
                break;
            }
        }
        debug!(diagram = consumer.table().id(), "consumer stopped");
    })
}
