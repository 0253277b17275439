//! Structured playback event stream.
//!
//! Discrete, typed events emitted by the sequencer driver. Events are
//! serialized as newline-delimited JSON (JSONL). Every line carries the
//! session id and a monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::phase::EntryCause;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during playback.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The driver started.
    PlaybackStarted {
        /// When the driver started.
        timestamp: DateTime<Utc>,
        /// Phase names in order.
        phases: Vec<String>,
        /// Initial speed multiplier.
        speed: f64,
        /// Whether playback started immediately.
        playing: bool,
    },

    /// A phase was entered.
    PhaseEntered {
        /// When the phase was entered.
        timestamp: DateTime<Utc>,
        /// Name of the phase.
        phase_name: String,
        /// Zero-based index of the phase.
        phase_index: usize,
        /// How the phase was entered.
        cause: EntryCause,
    },

    /// Playback was paused.
    PlaybackPaused {
        /// When playback paused.
        timestamp: DateTime<Utc>,
        /// Phase held while paused.
        phase_name: String,
    },

    /// Playback was resumed.
    PlaybackResumed {
        /// When playback resumed.
        timestamp: DateTime<Utc>,
        /// Phase whose wait restarts.
        phase_name: String,
    },

    /// The speed multiplier changed.
    SpeedChanged {
        /// When the speed changed.
        timestamp: DateTime<Utc>,
        /// Previous multiplier.
        from: f64,
        /// New multiplier.
        to: f64,
    },

    /// Playback was forced back to the first phase.
    Restarted {
        /// When the restart happened.
        timestamp: DateTime<Utc>,
        /// Phase that was active before the restart.
        from_phase: String,
    },

    /// A full loop through every phase and the settle hold completed.
    CycleCompleted {
        /// When the loop wrapped.
        timestamp: DateTime<Utc>,
        /// Number of completed loops so far.
        cycle: u64,
    },

    /// The driver stopped.
    PlaybackStopped {
        /// When the driver stopped.
        timestamp: DateTime<Utc>,
        /// Machine-readable stop reason.
        reason: String,
        /// Completed loops at stop time.
        cycles: u64,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with the session id and a sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    session: Uuid,
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each [`emit`](Self::emit) increments the sequence counter, writes one
/// line, and flushes. Serialization or I/O failures are dropped so a broken
/// event sink never stops playback.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    session: Uuid,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("session", &self.session)
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer under a fresh
    /// session id.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            session: Uuid::new_v4(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Session id stamped on every line.
    #[must_use]
    pub const fn session(&self) -> Uuid {
        self.session
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            session: self.session,
            sequence,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
