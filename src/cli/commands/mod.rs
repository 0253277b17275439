//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod play;
pub mod scenarios;
pub mod timeline;
pub mod validate;
pub mod version;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::{Cli, Commands, ScenarioSource, ScenariosSubcommand};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::TwinstepError;
use crate::scenarios::{DEFAULT_SCENARIO, find};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), TwinstepError> {
    match cli.command {
        Commands::Play(args) => play::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Timeline(args) => timeline::run(&args),
        Commands::Scenarios(cmd) => match cmd.subcommand {
            ScenariosSubcommand::List(args) => scenarios::list(&args),
            ScenariosSubcommand::Show(args) => scenarios::show(&args),
        },
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads the scenario named by `source`: a file, a built-in, or the default.
///
/// Validation warnings of scenario files are logged; built-ins are known
/// to be clean apart from deliberately idle nodes.
pub(crate) fn load_source(
    source: &ScenarioSource,
    loader: &ConfigLoader,
) -> Result<LoadResult, TwinstepError> {
    if let Some(path) = &source.config {
        info!(config = %path.display(), "loading scenario");
        let result = loader.load(path)?;
        for warning in &result.warnings {
            warn!(path = %warning.path, "{}", warning.message);
        }
        return Ok(result);
    }

    let name = source.scenario.as_deref().unwrap_or(DEFAULT_SCENARIO);
    info!(scenario = name, "loading built-in scenario");
    Ok(find(name)?.load(loader)?)
}
