//! dealsync - CRM deal to relational table sync
//!
//! Main entry point. `daemon` (the default) runs on the configured cron
//! schedule until interrupted; `run-once` performs a single sync and exits
//! non-zero when it fails.

use std::process::ExitCode;

use anyhow::Context;
use dealsync_app::utils::logging;
use dealsync_app::AppContext;
use dealsync_domain::ErrorKind;
use tracing::{error, info};

const USAGE: &str = "usage: dealsync [daemon | run-once | help]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Daemon,
    RunOnce,
    Help,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("daemon") => Some(Self::Daemon),
            Some("run-once") => Some(Self::RunOnce),
            Some("help" | "-h" | "--help") => Some(Self::Help),
            Some(_) => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{err:#}");
        }
        return ExitCode::FAILURE;
    }

    let arg = std::env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        error!(argument = arg.as_deref().unwrap_or_default(), "{USAGE}");
        return ExitCode::from(2);
    };

    let outcome = match command {
        Command::Help => {
            info!("{USAGE}");
            Ok(ExitCode::SUCCESS)
        }
        Command::RunOnce => run_once().await,
        Command::Daemon => daemon().await.map(|()| ExitCode::SUCCESS),
    };

    outcome.unwrap_or_else(|err| {
        error!(error = %format!("{err:#}"), "dealsync exited with an error");
        ExitCode::FAILURE
    })
}

async fn run_once() -> anyhow::Result<ExitCode> {
    let context = AppContext::new().await.context("failed to initialise")?;

    match context.job.run_once().await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // Another run holds the lock; nothing went wrong here.
        Err(err) if err.kind() == ErrorKind::Concurrency => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn daemon() -> anyhow::Result<()> {
    let context = AppContext::new().await.context("failed to initialise")?;
    let mut scheduler = context.scheduler().context("invalid schedule")?;

    scheduler.start().await.context("failed to start scheduler")?;
    info!(cron = %context.config.schedule.cron, "dealsync daemon running");

    shutdown_signal().await.context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    scheduler.stop().await.context("failed to stop scheduler")?;
    let snapshot = context.metrics.snapshot();
    info!(
        invocations = snapshot.invocations,
        succeeded = snapshot.succeeded,
        failed = snapshot.failed,
        skipped = snapshot.skipped,
        timeouts = snapshot.timeouts,
        "dealsync daemon stopped"
    );
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
