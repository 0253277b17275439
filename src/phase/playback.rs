//! Playback state machine.
//!
//! [`Playback`] owns the current phase index, the play flag, the speed, and
//! at most one pending timer. It never reads a clock: every operation takes
//! `now` and returns a [`Change`], which keeps the transition rules testable
//! without a runtime. The async driver in [`super::sequencer`] supplies the
//! clock and the single timer.
//!
//! States are `(index, playing)`. Transitions:
//! - advance `k -> k + 1` when the Advance timer fires (playing only)
//! - hold at `N - 1`, then loop to `0` when the Settle timer fires
//! - restart `any -> 0`, keeping the play flag
//! - pause/resume keep the index; resume restarts the phase's full wait

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::speed::{Speed, scale};
use super::step::StepSequence;

/// What a pending timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Move to the next phase (or start the settle hold at the terminal phase)
    Advance,
    /// End the settle hold and loop back to the first phase
    Settle,
}

/// The single outstanding scheduled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    /// What happens on fire
    pub kind: TimerKind,
    /// When it fires
    pub deadline: Instant,
}

/// Why a phase was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCause {
    /// Initial phase at construction
    Start,
    /// Natural timed advance
    Advance,
    /// Wrapped from the terminal phase after the settle hold
    Loop,
    /// Forced to the first phase by a restart
    Restart,
}

impl fmt::Display for EntryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Advance => "advance",
            Self::Loop => "loop",
            Self::Restart => "restart",
        };
        f.write_str(s)
    }
}

/// Outcome of a single state-machine operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// State did not change
    Nothing,
    /// A phase was entered
    Entered {
        /// Previous index
        from: usize,
        /// New index
        to: usize,
        /// Why it was entered
        cause: EntryCause,
    },
    /// The terminal phase elapsed; the settle hold is now running
    Holding {
        /// How long the hold lasts
        settle: Duration,
    },
    /// The play flag flipped
    PlayState {
        /// New value of the play flag
        playing: bool,
    },
    /// The speed multiplier changed
    Speed {
        /// Previous speed
        from: Speed,
        /// New speed
        to: Speed,
    },
}

impl Change {
    /// Whether observers should receive a fresh snapshot.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self, Self::Nothing | Self::Holding { .. })
    }
}

/// Value broadcast to presentation consumers on every visible change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Current phase index
    pub phase: usize,
    /// Current phase name
    pub name: Arc<str>,
    /// Play flag
    pub playing: bool,
    /// Speed multiplier
    pub speed: Speed,
    /// Entry counter, bumped on every phase entry (including re-entry of
    /// the same phase through a restart)
    pub entry: u64,
    /// How the current phase was entered
    pub cause: EntryCause,
    /// Number of completed loops
    pub cycle: u64,
}

/// Sequencer state record.
#[derive(Debug, Clone)]
pub struct Playback {
    sequence: Arc<StepSequence>,
    settle: Duration,
    index: usize,
    playing: bool,
    speed: Speed,
    pending: Option<PendingTimer>,
    entries: u64,
    cycles: u64,
    last_cause: EntryCause,
}

impl Playback {
    /// Creates the state at phase 0, scheduling the first wait if `playing`.
    #[must_use]
    pub fn new(
        sequence: Arc<StepSequence>,
        settle: Duration,
        speed: Speed,
        playing: bool,
        now: Instant,
    ) -> Self {
        let mut playback = Self {
            sequence,
            settle,
            index: 0,
            playing,
            speed,
            pending: None,
            entries: 0,
            cycles: 0,
            last_cause: EntryCause::Start,
        };
        if playing {
            playback.schedule_advance(now);
        }
        playback
    }

    /// Current phase index.
    #[must_use]
    pub const fn current_phase(&self) -> usize {
        self.index
    }

    /// Current phase name.
    #[must_use]
    pub fn phase_name(&self) -> &str {
        self.sequence.name(self.index)
    }

    /// Play flag.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current speed.
    #[must_use]
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    /// Settle hold length.
    #[must_use]
    pub const fn settle(&self) -> Duration {
        self.settle
    }

    /// The pending timer, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<PendingTimer> {
        self.pending
    }

    /// Deadline of the pending timer, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|t| t.deadline)
    }

    /// Whether the terminal phase is being held before looping.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        matches!(
            self.pending,
            Some(PendingTimer {
                kind: TimerKind::Settle,
                ..
            })
        )
    }

    /// Number of phase entries so far.
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Number of completed loops.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The phase sequence.
    #[must_use]
    pub const fn sequence(&self) -> &Arc<StepSequence> {
        &self.sequence
    }

    /// Effective wait for the current phase at the current speed.
    #[must_use]
    pub fn effective_duration(&self) -> Duration {
        self.speed.effective(self.sequence.nominal(self.index))
    }

    /// Builds the broadcast value for the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.index,
            name: self.sequence.name_arc(self.index),
            playing: self.playing,
            speed: self.speed,
            entry: self.entries,
            cause: self.last_cause,
            cycle: self.cycles,
        }
    }

    /// Sets the play flag and schedules the current phase's full wait.
    ///
    /// No-op when already playing.
    pub fn resume(&mut self, now: Instant) -> Change {
        if self.playing {
            return Change::Nothing;
        }
        self.playing = true;
        self.schedule_advance(now);
        Change::PlayState { playing: true }
    }

    /// Clears the play flag and cancels the pending timer.
    ///
    /// No-op when already paused.
    pub fn pause(&mut self) -> Change {
        if !self.playing {
            return Change::Nothing;
        }
        self.playing = false;
        self.pending = None;
        Change::PlayState { playing: false }
    }

    /// Pauses when playing, resumes when paused.
    pub fn toggle(&mut self, now: Instant) -> Change {
        if self.playing {
            self.pause()
        } else {
            self.resume(now)
        }
    }

    /// Changes speed, rescaling the remaining Advance wait by `old / new`.
    ///
    /// The settle hold is not speed-scaled and is left untouched.
    pub fn set_speed(&mut self, speed: Speed, now: Instant) -> Change {
        let old = self.speed;
        if old == speed {
            return Change::Nothing;
        }
        if let Some(PendingTimer {
            kind: TimerKind::Advance,
            deadline,
        }) = self.pending
        {
            let remaining = deadline.saturating_duration_since(now);
            let rescaled = scale(remaining, old.get() / speed.get());
            self.pending = Some(PendingTimer {
                kind: TimerKind::Advance,
                deadline: deadline_after(now, rescaled),
            });
        }
        self.speed = speed;
        Change::Speed {
            from: old,
            to: speed,
        }
    }

    /// Forces phase 0, cancelling any pending timer first. Keeps the play
    /// flag; when playing, the first phase's wait starts over.
    pub fn restart(&mut self, now: Instant) -> Change {
        self.pending = None;
        let from = self.index;
        self.enter(0, EntryCause::Restart);
        if self.playing {
            self.schedule_advance(now);
        }
        Change::Entered {
            from,
            to: 0,
            cause: EntryCause::Restart,
        }
    }

    /// Timer body for an elapsed phase.
    ///
    /// Moves to the next phase; at the terminal phase, stays put and (when
    /// playing) schedules the settle hold instead.
    pub fn advance(&mut self, now: Instant) -> Change {
        self.pending = None;
        let from = self.index;
        if from < self.sequence.last_index() {
            self.enter(from + 1, EntryCause::Advance);
            if self.playing {
                self.schedule_advance(now);
            }
            return Change::Entered {
                from,
                to: from + 1,
                cause: EntryCause::Advance,
            };
        }
        if !self.playing {
            return Change::Nothing;
        }
        self.pending = Some(PendingTimer {
            kind: TimerKind::Settle,
            deadline: deadline_after(now, self.settle),
        });
        Change::Holding {
            settle: self.settle,
        }
    }

    /// Timer body for an elapsed settle hold: wraps to phase 0.
    pub fn settle_elapsed(&mut self, now: Instant) -> Change {
        self.pending = None;
        let from = self.index;
        self.cycles += 1;
        self.enter(0, EntryCause::Loop);
        if self.playing {
            self.schedule_advance(now);
        }
        Change::Entered {
            from,
            to: 0,
            cause: EntryCause::Loop,
        }
    }

    /// Fires the pending timer if its deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Change {
        match self.pending {
            Some(timer) if timer.deadline <= now => match timer.kind {
                TimerKind::Advance => self.advance(now),
                TimerKind::Settle => self.settle_elapsed(now),
            },
            _ => Change::Nothing,
        }
    }

    fn enter(&mut self, index: usize, cause: EntryCause) {
        self.index = index;
        self.entries += 1;
        self.last_cause = cause;
    }

    fn schedule_advance(&mut self, now: Instant) {
        self.pending = Some(PendingTimer {
            kind: TimerKind::Advance,
            deadline: deadline_after(now, self.effective_duration()),
        });
    }
}

/// `now + wait`, capped at roughly thirty years out.
fn deadline_after(now: Instant, wait: Duration) -> Instant {
    now.checked_add(wait.min(FAR_FUTURE))
        .unwrap_or_else(|| now + Duration::from_secs(1))
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
