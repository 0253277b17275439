//! `timeline` command handler
//!
//! Prints when each phase of one cycle would start at a given speed.

use std::fmt::Write as _;

use serde_json::json;

use crate::cli::args::{OutputFormat, TimelineArgs};
use crate::cli::commands::load_source;
use crate::config::{ConfigLoader, Scenario};
use crate::error::TwinstepError;
use crate::phase::Speed;

/// Print the planned phase timeline of a scenario.
///
/// # Errors
///
/// Returns a config error if the scenario does not load, or a sequencer
/// error for a non-positive `--speed`.
pub fn run(args: &TimelineArgs) -> Result<(), TwinstepError> {
    let loaded = load_source(&args.source, &ConfigLoader::with_defaults())?;
    let scenario = loaded.scenario;
    let speed = scenario.speed_range.admit(args.speed)?;

    match args.format {
        OutputFormat::Human => print!("{}", format_table(&scenario, speed)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&to_json(&scenario, speed))?);
        }
    }
    Ok(())
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn format_table(scenario: &Scenario, speed: Speed) -> String {
    let rows = scenario.sequence.timeline(speed);
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(5);

    let mut out = String::new();
    let _ = writeln!(out, "{} at {speed}", scenario.title);
    let _ = writeln!(out, "  {:>2}  {:<width$}  {:>8}  {:>8}", "#", "phase", "start", "duration");
    for row in &rows {
        let _ = writeln!(
            out,
            "  {:>2}  {:<width$}  {:>6}ms  {:>6}ms",
            row.index + 1,
            row.name,
            millis(row.starts_at),
            millis(row.effective)
        );
    }
    let _ = writeln!(
        out,
        "  settle {}ms, cycle {}ms",
        millis(scenario.settle),
        millis(scenario.sequence.cycle_duration(speed, scenario.settle))
    );
    out
}

fn to_json(scenario: &Scenario, speed: Speed) -> serde_json::Value {
    json!({
        "title": scenario.title,
        "speed": speed,
        "settle_ms": millis(scenario.settle),
        "cycle_ms": millis(scenario.sequence.cycle_duration(speed, scenario.settle)),
        "phases": scenario.sequence.timeline(speed),
    })
}
