//! Sequencer driver.
//!
//! The driver task is the single owner of the [`Playback`] state. It waits on
//! exactly one deadline at a time, applies control commands between timer
//! firings, and publishes a [`Snapshot`] on a `watch` channel whenever
//! something visible changes. The deadline is recomputed on every loop
//! iteration, so a timer that was cancelled or rescheduled is simply dropped
//! and can never fire late.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SequencerError;
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

use super::playback::{Change, EntryCause, Playback, Snapshot};
use super::speed::{Speed, SpeedRange};
use super::step::StepSequence;

/// Everything the driver needs to start.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Ordered phases with their nominal durations
    pub sequence: Arc<StepSequence>,
    /// Hold at the terminal phase before looping
    pub settle: Duration,
    /// Admissible speeds
    pub speed_range: SpeedRange,
    /// Speed at start
    pub initial_speed: Speed,
    /// Start playing immediately
    pub autoplay: bool,
    /// Stop by itself after this many completed loops
    pub max_cycles: Option<u64>,
}

impl SequencerConfig {
    /// Config with the default speed range, 1x, autoplay, and no cycle limit.
    #[must_use]
    pub fn new(sequence: Arc<StepSequence>, settle: Duration) -> Self {
        Self {
            sequence,
            settle,
            speed_range: SpeedRange::default(),
            initial_speed: Speed::NORMAL,
            autoplay: true,
            max_cycles: None,
        }
    }
}

/// Why the driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired
    Cancelled,
    /// Every handle was dropped
    HandlesDropped,
    /// `max_cycles` loops completed
    CyclesCompleted,
}

impl StopReason {
    /// Stable label used in logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::HandlesDropped => "handles_dropped",
            Self::CyclesCompleted => "cycles_completed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Play,
    Pause,
    Toggle,
    SetSpeed(Speed),
    Faster,
    Slower,
    Restart,
}

impl Command {
    const fn label(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Toggle => "toggle",
            Self::SetSpeed(_) => "speed",
            Self::Faster => "faster",
            Self::Slower => "slower",
            Self::Restart => "restart",
        }
    }
}

/// Cloneable control handle for a running sequencer.
///
/// This is the only mutation path. Observers should be given the receiver
/// from [`subscribe`](Self::subscribe), never the handle.
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    speed_range: SpeedRange,
    sequence: Arc<StepSequence>,
    cancel: CancellationToken,
}

impl SequencerHandle {
    fn send(&self, command: Command) -> Result<(), SequencerError> {
        self.commands
            .send(command)
            .map_err(|_| SequencerError::Stopped)
    }

    /// Starts or resumes playback. No-op if already playing.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn play(&self) -> Result<(), SequencerError> {
        self.send(Command::Play)
    }

    /// Pauses playback and cancels the pending transition.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn pause(&self) -> Result<(), SequencerError> {
        self.send(Command::Pause)
    }

    /// Flips the play flag.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn toggle(&self) -> Result<(), SequencerError> {
        self.send(Command::Toggle)
    }

    /// Requests a new speed multiplier.
    ///
    /// Out-of-range values are clamped; the admitted speed is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidSpeed`] for non-positive or
    /// non-finite input, or [`SequencerError::Stopped`] if the driver has
    /// exited.
    pub fn set_speed(&self, multiplier: f64) -> Result<Speed, SequencerError> {
        let speed = self.speed_range.admit(multiplier)?;
        self.send(Command::SetSpeed(speed))?;
        Ok(speed)
    }

    /// Moves one discrete speed step up.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn faster(&self) -> Result<(), SequencerError> {
        self.send(Command::Faster)
    }

    /// Moves one discrete speed step down.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn slower(&self) -> Result<(), SequencerError> {
        self.send(Command::Slower)
    }

    /// Forces phase 0, keeping the play flag.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Stopped`] if the driver has exited.
    pub fn restart(&self) -> Result<(), SequencerError> {
        self.send(Command::Restart)
    }

    /// A new read-only receiver of snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Index of the current phase, as last published.
    #[must_use]
    pub fn current_phase(&self) -> usize {
        self.snapshots.borrow().phase
    }

    /// The phase sequence being played.
    #[must_use]
    pub const fn sequence(&self) -> &Arc<StepSequence> {
        &self.sequence
    }

    /// Admissible speeds.
    #[must_use]
    pub const fn speed_range(&self) -> SpeedRange {
        self.speed_range
    }

    /// Whether the driver is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stops the driver. No timer fires afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// The driver task state.
pub struct Sequencer {
    playback: Playback,
    speed_range: SpeedRange,
    max_cycles: Option<u64>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Snapshot>,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
}

impl Sequencer {
    /// Spawns the driver on the current runtime and returns its handle.
    ///
    /// The driver stops when `cancel` fires, when every handle has been
    /// dropped, or after `max_cycles` loops.
    #[must_use]
    pub fn spawn(
        config: SequencerConfig,
        events: Arc<EventEmitter>,
        cancel: CancellationToken,
    ) -> (SequencerHandle, JoinHandle<StopReason>) {
        let playback = Playback::new(
            Arc::clone(&config.sequence),
            config.settle,
            config.initial_speed,
            config.autoplay,
            Instant::now(),
        );
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(playback.snapshot());

        let handle = SequencerHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            speed_range: config.speed_range,
            sequence: Arc::clone(&config.sequence),
            cancel: cancel.clone(),
        };

        let driver = Self {
            playback,
            speed_range: config.speed_range,
            max_cycles: config.max_cycles,
            commands: command_rx,
            snapshots: snapshot_tx,
            events,
            cancel,
        };

        (handle, tokio::spawn(driver.run()))
    }

    async fn run(mut self) -> StopReason {
        info!(
            phases = self.playback.sequence().len(),
            settle_ms = self.playback.settle().as_millis(),
            speed = %self.playback.speed(),
            playing = self.playback.is_playing(),
            "sequencer started"
        );
        self.events.emit(Event::PlaybackStarted {
            timestamp: Utc::now(),
            phases: self.playback.sequence().names().map(str::to_owned).collect(),
            speed: self.playback.speed().get(),
            playing: self.playback.is_playing(),
        });
        metrics::set_speed(self.playback.speed());
        metrics::record_phase_entry(self.playback.phase_name());

        let reason = loop {
            let deadline = self.playback.deadline();
            let change = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break StopReason::Cancelled,
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command, Instant::now()),
                    None => break StopReason::HandlesDropped,
                },
                () = wait_until(deadline) => self.playback.fire(Instant::now()),
            };

            self.observe(change);
            if change.is_visible() {
                self.snapshots.send_replace(self.playback.snapshot());
            }

            if let Some(limit) = self.max_cycles {
                if self.playback.cycles() >= limit {
                    break StopReason::CyclesCompleted;
                }
            }
        };

        info!(reason = reason.as_str(), cycles = self.playback.cycles(), "sequencer stopped");
        self.events.emit(Event::PlaybackStopped {
            timestamp: Utc::now(),
            reason: reason.as_str().to_owned(),
            cycles: self.playback.cycles(),
        });
        reason
    }

    fn apply(&mut self, command: Command, now: Instant) -> Change {
        debug!(command = command.label(), "control command");
        metrics::record_control_command(command.label());
        match command {
            Command::Play => self.playback.resume(now),
            Command::Pause => self.playback.pause(),
            Command::Toggle => self.playback.toggle(now),
            Command::SetSpeed(speed) => self.playback.set_speed(speed, now),
            Command::Faster => {
                let next = self.speed_range.faster(self.playback.speed());
                self.playback.set_speed(next, now)
            }
            Command::Slower => {
                let next = self.speed_range.slower(self.playback.speed());
                self.playback.set_speed(next, now)
            }
            Command::Restart => self.playback.restart(now),
        }
    }

    fn observe(&self, change: Change) {
        let timestamp = Utc::now();
        match change {
            Change::Nothing => {}
            Change::Entered { from, to, cause } => {
                let name = self.playback.phase_name();
                info!(
                    from,
                    to,
                    phase = name,
                    %cause,
                    next_in_ms = self.playback.effective_duration().as_millis(),
                    "phase transition"
                );
                metrics::record_phase_entry(name);
                match cause {
                    EntryCause::Loop => {
                        metrics::record_cycle();
                        self.events.emit(Event::CycleCompleted {
                            timestamp,
                            cycle: self.playback.cycles(),
                        });
                    }
                    EntryCause::Restart => self.events.emit(Event::Restarted {
                        timestamp,
                        from_phase: self.playback.sequence().name(from).to_owned(),
                    }),
                    EntryCause::Start | EntryCause::Advance => {}
                }
                self.events.emit(Event::PhaseEntered {
                    timestamp,
                    phase_name: name.to_owned(),
                    phase_index: to,
                    cause,
                });
            }
            Change::Holding { settle } => {
                debug!(
                    phase = self.playback.phase_name(),
                    settle_ms = settle.as_millis(),
                    "terminal phase elapsed; holding before loop"
                );
            }
            Change::PlayState { playing } => {
                info!(playing, phase = self.playback.phase_name(), "play state changed");
                let phase_name = self.playback.phase_name().to_owned();
                self.events.emit(if playing {
                    Event::PlaybackResumed {
                        timestamp,
                        phase_name,
                    }
                } else {
                    Event::PlaybackPaused {
                        timestamp,
                        phase_name,
                    }
                });
            }
            Change::Speed { from, to } => {
                info!(%from, %to, "speed changed");
                metrics::set_speed(to);
                self.events.emit(Event::SpeedChanged {
                    timestamp,
                    from: from.get(),
                    to: to.get(),
                });
            }
        }
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("current_phase", &self.playback.current_phase())
            .field("playing", &self.playback.is_playing())
            .field("speed", &self.playback.speed())
            .finish_non_exhaustive()
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
