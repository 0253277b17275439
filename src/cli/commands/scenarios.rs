//! Scenarios command handlers
//!
//! Implements `scenarios list` and `scenarios show`.

use std::fmt::Write as _;

use crate::cli::args::{OutputFormat, ScenariosListArgs, ScenariosShowArgs};
use crate::error::TwinstepError;
use crate::scenarios;

/// List available built-in scenarios.
///
/// # Errors
///
/// Returns a JSON error if output serialization fails.
pub fn list(args: &ScenariosListArgs) -> Result<(), TwinstepError> {
    let results = scenarios::list_scenarios(args.tag.as_deref());

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "description": s.description,
                        "tags": s.tags,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Human => {
            if results.is_empty() {
                println!("No scenarios match the given filters.");
                return Ok(());
            }

            println!("Built-in Scenarios ({} available)\n", results.len());
            for s in &results {
                let tags = format!("[{}]", s.tags.join(", "));
                println!("  {:<24}{:<56}{tags}", s.name, s.description);
            }
            println!();
            println!("Play a scenario: twinstep play <name>");
            println!("View YAML:       twinstep scenarios show <name>");
        }
    }

    Ok(())
}

/// Display the YAML of a built-in scenario.
///
/// Prints raw YAML to stdout, suitable for piping into a file and editing.
///
/// # Errors
///
/// Returns a usage error if the scenario name is not found.
pub fn show(args: &ScenariosShowArgs) -> Result<(), TwinstepError> {
    let scenario = scenarios::find_scenario(&args.name)
        .ok_or_else(|| TwinstepError::Usage(unknown_scenario_message(&args.name)))?;
    print!("{}", scenario.yaml);
    Ok(())
}

fn unknown_scenario_message(name: &str) -> String {
    let mut message = format!("Unknown scenario '{name}'");

    if let Some(suggestion) = scenarios::suggest_scenario(name) {
        let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
    }

    message.push_str("\n\nAvailable scenarios:");
    for s in scenarios::list_scenarios(None) {
        let _ = write!(message, "\n  {:<24}{}", s.name, s.description);
    }

    message.push_str("\n\nUse 'twinstep scenarios list' for full details.");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_scenario_message() {
        let message = unknown_scenario_message("minimall");
        assert!(message.contains("Did you mean 'minimal'?"));
        assert!(message.contains("diagnose-system-issue"));
    }

    #[test]
    fn test_show_unknown_is_usage_error() {
        let err = show(&ScenariosShowArgs {
            name: "nope-nope-nope".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::ExitCode::USAGE_ERROR);
        assert!(!err.to_string().contains("Did you mean"));
    }
}
