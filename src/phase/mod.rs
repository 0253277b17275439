//! Phase sequencing
//!
//! The ordered phase list, the speed multiplier, the pure playback state
//! machine, and the async driver that owns its single timer.

pub mod playback;
pub mod sequencer;
pub mod speed;
pub mod step;

pub use playback::{Change, EntryCause, PendingTimer, Playback, Snapshot, TimerKind};
pub use sequencer::{Sequencer, SequencerConfig, SequencerHandle, StopReason};
pub use speed::{Speed, SpeedRange};
pub use step::{Step, StepSequence, TimelineEntry};
