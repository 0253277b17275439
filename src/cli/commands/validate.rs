//! `validate` command handler
//!
//! Loads every file, reports all errors and warnings, and fails if any
//! file is invalid.

use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, TwinstepError, ValidationIssue};

/// Outcome for one file.
#[derive(Debug)]
struct FileReport {
    file: String,
    phases: usize,
    diagrams: usize,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    failure: Option<ConfigError>,
}

/// Validate scenario files without playing them.
///
/// # Errors
///
/// Returns the first file's config error if any file fails to load, or
/// (with `--strict`) has warnings.
pub fn run(args: &ValidateArgs) -> Result<(), TwinstepError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| check(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = reports.iter().map(to_json).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    match reports.iter_mut().find_map(|r| r.failure.take()) {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

fn check(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    info!(file = %path.display(), "validating scenario");
    let file = path.display().to_string();
    match loader.load(path) {
        Ok(result) => {
            let failure = (strict && !result.warnings.is_empty()).then(|| {
                ConfigError::ValidationError {
                    path: file.clone(),
                    errors: result.warnings.clone(),
                }
            });
            FileReport {
                phases: result.scenario.sequence.len(),
                diagrams: result.scenario.diagrams.len(),
                errors: Vec::new(),
                warnings: result.warnings,
                failure,
                file,
            }
        }
        Err(e) => FileReport {
            phases: 0,
            diagrams: 0,
            errors: match &e {
                ConfigError::ValidationError { errors, .. } => errors.clone(),
                other => vec![ValidationIssue::error("", other.to_string())],
            },
            warnings: Vec::new(),
            failure: Some(e),
            file,
        },
    }
}

fn print_human(report: &FileReport) {
    if report.failure.is_none() {
        println!(
            "{}: valid ({} phases, {} diagrams)",
            report.file, report.phases, report.diagrams
        );
    } else {
        println!("{}: invalid", report.file);
    }
    for issue in report.errors.iter().chain(&report.warnings) {
        if issue.path.is_empty() {
            println!("  {}", issue.message);
        } else {
            println!("  {issue}");
        }
    }
}

fn to_json(report: &FileReport) -> serde_json::Value {
    let issues = |list: &[ValidationIssue]| -> Vec<serde_json::Value> {
        list.iter()
            .map(|i| json!({ "path": i.path, "message": i.message }))
            .collect()
    };
    json!({
        "file": report.file,
        "valid": report.failure.is_none(),
        "phases": report.phases,
        "diagrams": report.diagrams,
        "errors": issues(&report.errors),
        "warnings": issues(&report.warnings),
    })
}
