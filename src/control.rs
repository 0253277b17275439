//! Control surface.
//!
//! Parses one-line text commands and forwards them to a
//! [`SequencerHandle`]. This is the only component that mutates playback;
//! presentation consumers never see the handle.

use std::io::Write;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::validation::did_you_mean;
use crate::error::{ControlError, TwinstepError};
use crate::observability::metrics;
use crate::phase::{SequencerHandle, Snapshot};

/// Words the parser accepts, used for did-you-mean suggestions.
const COMMAND_WORDS: [&str; 17] = [
    "toggle", "space", "play", "resume", "pause", "speed", "faster", "slower", "restart",
    "status", "quit", "exit", "help", "p", "r", "s", "q",
];

/// Help text listing every command.
pub const HELP: &str = "\
commands:
  p | toggle | <space>   play/pause
  play | pause           set play state
  speed <x> | <x>x       set speed (e.g. 'speed 2', '1.5x')
  + | faster             next speed step
  - | slower             previous speed step
  r | restart            back to the first phase
  s | status             show the current phase
  q | quit               stop playback
  h | help               this text";

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Pause when playing, resume when paused
    Toggle,
    /// Start or resume
    Play,
    /// Pause
    Pause,
    /// Request a speed multiplier (validated by the sequencer)
    Speed(f64),
    /// One speed step up
    Faster,
    /// One speed step down
    Slower,
    /// Force the first phase
    Restart,
    /// Report the current snapshot
    Status,
    /// Stop playback
    Quit,
    /// Show the command list
    Help,
}

impl FromStr for ControlCommand {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            // A lone space is the play/pause key
            return if line.is_empty() {
                Err(ControlError::Empty)
            } else {
                Ok(Self::Toggle)
            };
        }

        let tokens = shlex::split(line).ok_or_else(|| ControlError::Tokenize(line.to_string()))?;
        let Some((word, args)) = tokens.split_first() else {
            return Err(ControlError::Empty);
        };
        let word = word.to_lowercase();

        let command = match word.as_str() {
            "p" | "toggle" | "space" => Self::Toggle,
            "play" | "resume" => Self::Play,
            "pause" => Self::Pause,
            "+" | "faster" => Self::Faster,
            "-" | "slower" => Self::Slower,
            "r" | "restart" => Self::Restart,
            "s" | "status" => Self::Status,
            "q" | "quit" | "exit" => Self::Quit,
            "h" | "help" | "?" => Self::Help,
            "speed" => {
                let [arg] = args else {
                    return Err(ControlError::InvalidArgument {
                        command: word,
                        message: "expected exactly one multiplier, e.g. 'speed 1.5'".to_string(),
                    });
                };
                let value = parse_multiplier(arg).ok_or_else(|| ControlError::InvalidArgument {
                    command: word.clone(),
                    message: format!("'{arg}' is not a number"),
                })?;
                return Ok(Self::Speed(value));
            }
            other => {
                if let Some(value) = other.strip_suffix('x').and_then(parse_multiplier) {
                    Self::Speed(value)
                } else {
                    return Err(ControlError::UnknownCommand {
                        input: other.to_string(),
                        suggestion: did_you_mean(other, COMMAND_WORDS.into_iter()),
                    });
                }
            }
        };

        if !args.is_empty() {
            return Err(ControlError::InvalidArgument {
                command: word,
                message: "takes no arguments".to_string(),
            });
        }
        Ok(command)
    }
}

/// Parses `"2"`, `"1.5"` or `"1.5x"`. Range checks happen in the sequencer.
fn parse_multiplier(text: &str) -> Option<f64> {
    let text = text.trim();
    let number = text.strip_suffix(['x', 'X']).unwrap_or(text);
    number.parse().ok()
}

/// What the caller should do after a command was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Forwarded to the sequencer
    Applied,
    /// Current state, for display
    Status(Snapshot),
    /// The caller should show [`HELP`]
    Help,
    /// The caller should stop playback
    Quit,
}

/// Formats a snapshot as a one-line status report.
#[must_use]
pub fn format_status(snapshot: &Snapshot, phases: usize) -> String {
    format!(
        "phase {}/{} {} ({}, {}, cycle {})",
        snapshot.phase + 1,
        phases,
        snapshot.name,
        if snapshot.playing { "playing" } else { "paused" },
        snapshot.speed,
        snapshot.cycle
    )
}

/// Forwards control commands to a running sequencer.
#[derive(Debug, Clone)]
pub struct ControlSurface {
    handle: SequencerHandle,
}

impl ControlSurface {
    /// Creates a control surface for `handle`.
    #[must_use]
    pub const fn new(handle: SequencerHandle) -> Self {
        Self { handle }
    }

    /// The controlled sequencer.
    #[must_use]
    pub const fn handle(&self) -> &SequencerHandle {
        &self.handle
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Returns a sequencer error for an invalid speed or a stopped driver.
    pub fn apply(&self, command: ControlCommand) -> Result<Reply, TwinstepError> {
        debug!(?command, "applying control command");
        match command {
            ControlCommand::Toggle => self.handle.toggle()?,
            ControlCommand::Play => self.handle.play()?,
            ControlCommand::Pause => self.handle.pause()?,
            ControlCommand::Speed(value) => {
                self.handle.set_speed(value)?;
            }
            ControlCommand::Faster => self.handle.faster()?,
            ControlCommand::Slower => self.handle.slower()?,
            ControlCommand::Restart => self.handle.restart()?,
            ControlCommand::Status => {
                metrics::record_control_command("status");
                return Ok(Reply::Status(self.handle.snapshot()));
            }
            ControlCommand::Help => return Ok(Reply::Help),
            ControlCommand::Quit => {
                metrics::record_control_command("quit");
                return Ok(Reply::Quit);
            }
        }
        Ok(Reply::Applied)
    }

    /// Parses and applies one line of input.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`] for unparseable input, or a sequencer
    /// error from [`apply`](Self::apply).
    pub fn apply_line(&self, line: &str) -> Result<Reply, TwinstepError> {
        let command: ControlCommand = line.parse()?;
        self.apply(command)
    }

    /// Reads commands line by line from `reader`, writing replies and
    /// errors to `out`, until EOF, `quit`, or cancellation.
    ///
    /// `quit` cancels `cancel`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `reader` fails.
    pub async fn run<R, W>(
        &self,
        reader: R,
        mut out: W,
        cancel: CancellationToken,
    ) -> Result<(), TwinstepError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = reader.lines();
        let phases = self.handle.sequence().len();
        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => break,
                line = lines.next_line() => match line? {
                    Some(line) => line,
                    None => {
                        debug!("control input closed");
                        break;
                    }
                },
            };
            if line.is_empty() {
                continue;
            }

            match self.apply_line(&line) {
                Ok(Reply::Applied) => {}
                Ok(Reply::Status(snapshot)) => {
                    let _ = writeln!(out, "{}", format_status(&snapshot, phases));
                }
                Ok(Reply::Help) => {
                    let _ = writeln!(out, "{HELP}");
                }
                Ok(Reply::Quit) => {
                    cancel.cancel();
                    break;
                }
                Err(TwinstepError::Control(e)) => {
                    let _ = writeln!(out, "{e}");
                }
                Err(e) => {
                    warn!(error = %e, "control command failed");
                    let _ = writeln!(out, "{e}");
                    if !self.handle.is_running() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Runs the control surface on stdin, replying on stderr.
///
/// # Errors
///
/// Returns an I/O error if stdin cannot be read.
pub async fn run_stdin(
    handle: SequencerHandle,
    cancel: CancellationToken,
) -> Result<(), TwinstepError> {
    let surface = ControlSurface::new(handle);
    let stdin = BufReader::new(tokio::io::stdin());
    surface.run(stdin, std::io::stderr(), cancel).await
}
