//! Metrics collection for `twinstep`.
//!
//! Prometheus-compatible counters and gauges for playback, with label
//! cardinality protection for values that come from scenario files or
//! user input.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TwinstepError;
use crate::phase::Speed;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Control commands accepted as metric labels.
const KNOWN_COMMANDS: [&str; 9] = [
    "toggle", "play", "pause", "speed", "faster", "slower", "restart", "status", "quit",
];

/// Maximum length for phase name labels.
const MAX_PHASE_LABEL_LEN: usize = 64;

/// Initializes the global metrics recorder.
///
/// With `Some(port)` a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`; with `None` the recorder is installed without one.
///
/// # Errors
///
/// Returns `TwinstepError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TwinstepError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TwinstepError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "twinstep_phase_entries_total",
        "Total number of phase entries by phase"
    );
    describe_counter!(
        "twinstep_cycles_total",
        "Completed loops through the whole sequence"
    );
    describe_counter!(
        "twinstep_control_commands_total",
        "Control commands applied by the sequencer"
    );
    describe_gauge!("twinstep_speed_multiplier", "Current playback speed");
}

/// Sanitizes a command word for use as a metrics label.
#[must_use]
pub fn sanitize_command_label(command: &str) -> &str {
    if KNOWN_COMMANDS.contains(&command) {
        command
    } else {
        "__unknown__"
    }
}

/// Truncates a phase name and replaces characters invalid in labels.
fn sanitize_phase_label(name: &str) -> String {
    name.chars()
        .take(MAX_PHASE_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Records entry into a phase.
pub fn record_phase_entry(phase: &str) {
    counter!("twinstep_phase_entries_total", "phase" => sanitize_phase_label(phase)).increment(1);
}

/// Records a completed loop.
pub fn record_cycle() {
    counter!("twinstep_cycles_total").increment(1);
}

/// Records a control command reaching the sequencer.
pub fn record_control_command(command: &str) {
    let label = sanitize_command_label(command);
    counter!("twinstep_control_commands_total", "command" => label.to_owned()).increment(1);
}

/// Sets the speed gauge.
pub fn set_speed(speed: Speed) {
    gauge!("twinstep_speed_multiplier").set(speed.get());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_known_command() {
        assert_eq!(sanitize_command_label("restart"), "restart");
        assert_eq!(sanitize_command_label("rm -rf"), "__unknown__");
    }

    #[test]
    fn test_sanitize_phase_label() {
        assert_eq!(sanitize_phase_label("action"), "action");
        assert_eq!(sanitize_phase_label("tool call"), "tool_call");
        assert_eq!(sanitize_phase_label(&"x".repeat(200)).len(), MAX_PHASE_LABEL_LEN);
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_phase_entry("input");
        record_cycle();
        record_control_command("faster");
        set_speed(Speed::NORMAL);
    }
}
