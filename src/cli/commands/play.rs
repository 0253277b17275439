//! `play` command handler
//!
//! Wires one sequencer, one consumer per diagram, and the stdin control
//! surface together, then waits for the driver to stop.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::args::{OutputFormat, PlayArgs};
use crate::cli::commands::load_source;
use crate::config::validation::did_you_mean;
use crate::config::{ConfigLoader, Scenario};
use crate::control;
use crate::error::TwinstepError;
use crate::observability::{EventEmitter, init_metrics};
use crate::phase::{Sequencer, SequencerConfig};
use crate::presentation::{
    Consumer, DiagramTable, JsonRenderer, Renderer, TextRenderer, spawn_consumer,
};

/// Play a scenario until it is quit, interrupted, or runs out of cycles.
///
/// # Errors
///
/// Returns a config error if the scenario does not load, a usage error for
/// an unknown `--diagram` id, a sequencer error for an invalid `--speed`,
/// or an I/O error if the events file or metrics endpoint cannot be opened.
pub async fn run(args: &PlayArgs, cancel: CancellationToken) -> Result<(), TwinstepError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let loaded = load_source(&args.source, &ConfigLoader::with_defaults())?;
    let scenario = loaded.scenario;
    let tables = select_diagrams(&scenario, &args.diagrams)?;
    let config = sequencer_config(&scenario, args)?;

    let emitter = if let Some(path) = &args.events_file {
        EventEmitter::from_file(path)?
    } else if args.events_stderr {
        EventEmitter::stderr()
    } else {
        EventEmitter::noop()
    };

    info!(
        title = %scenario.title,
        phases = scenario.sequence.len(),
        diagrams = tables.len(),
        speed = %config.initial_speed,
        "starting playback"
    );
    let (handle, driver) = Sequencer::spawn(config, Arc::new(emitter), cancel.child_token());

    let consumers: Vec<_> = tables
        .into_iter()
        .map(|table| {
            let consumer = Consumer::new(table).with_sync_packets(args.sync_packets);
            spawn_consumer(
                consumer,
                handle.subscribe(),
                renderer(args.format),
                cancel.clone(),
            )
        })
        .collect();

    let input = if args.no_input {
        None
    } else {
        if std::io::stdin().is_terminal() {
            eprintln!("controls: p play/pause, +/- speed, r restart, s status, q quit (h for help)");
        }
        let handle = handle.clone();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = control::run_stdin(handle, cancel).await {
                warn!(error = %e, "control input failed");
            }
        }))
    };

    let reason = driver.await.map_err(std::io::Error::other)?;
    info!(reason = reason.as_str(), "playback stopped");

    // The driver dropped its sender, so consumers drain the last frame and end
    for consumer in consumers {
        if let Err(e) = consumer.await {
            debug!(error = %e, "consumer task failed");
        }
    }
    if let Some(input) = input {
        input.abort();
    }
    Ok(())
}

/// Diagram tables to render: the ones named by `--diagram`, or all.
fn select_diagrams(
    scenario: &Scenario,
    ids: &[String],
) -> Result<Vec<Arc<DiagramTable>>, TwinstepError> {
    if ids.is_empty() {
        return Ok(scenario.diagrams.clone());
    }
    ids.iter()
        .map(|id| {
            scenario.diagram(id).cloned().ok_or_else(|| {
                let known = scenario.diagrams.iter().map(|d| d.id());
                let mut message = format!("unknown diagram '{id}'");
                if let Some(suggestion) = did_you_mean(id, known) {
                    let _ = write!(message, " (did you mean '{suggestion}'?)");
                }
                TwinstepError::Usage(message)
            })
        })
        .collect()
}

/// Scenario driver settings with the command-line overrides applied.
fn sequencer_config(scenario: &Scenario, args: &PlayArgs) -> Result<SequencerConfig, TwinstepError> {
    let mut config = scenario.sequencer_config();
    if let Some(speed) = args.speed {
        config.initial_speed = config.speed_range.admit(speed)?;
    }
    if args.paused {
        config.autoplay = false;
    }
    config.max_cycles = args.cycles;
    Ok(config)
}

fn renderer(format: OutputFormat) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Human => Box::new(TextRenderer::stdout()),
        OutputFormat::Json => Box::new(JsonRenderer::stdout()),
    }
}
