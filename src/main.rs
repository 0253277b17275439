//! `twinstep` - step-by-step playback of side-by-side architecture diagrams

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use twinstep::cli::args::{Cli, OutputFormat};
use twinstep::cli::commands;
use twinstep::error::ExitCode;
use twinstep::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match cli.log_format {
            OutputFormat::Human => LogFormat::Human,
            OutputFormat::Json => LogFormat::Json,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    let cancel = CancellationToken::new();
    let signalled = Arc::new(AtomicI32::new(ExitCode::SUCCESS));

    // First signal stops playback gracefully, second one exits immediately
    let shutdown = cancel.clone();
    let exit_code = Arc::clone(&signalled);
    tokio::spawn(async move {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            tracing::warn!("failed to register SIGTERM handler");
            return;
        };

        let code = tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = sigterm.recv() => ExitCode::TERMINATED,
        };
        tracing::info!(code, "shutting down");
        exit_code.store(code, Ordering::SeqCst);
        shutdown.cancel();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli, cancel).await;

    match result {
        Ok(()) => std::process::exit(signalled.load(Ordering::SeqCst)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
