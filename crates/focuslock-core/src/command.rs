use anyhow::{Context, Result};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;

/// Limit for hooks and notifications that should return promptly
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Run `argv` to completion within `limit`, returning its exit status.
///
/// The child is killed if the limit elapses.
///
/// # Errors
///
/// Returns an error if `argv` is empty, the program cannot be started, or it
/// does not finish in time
pub async fn run_status(argv: &[String], limit: Duration) -> Result<ExitStatus> {
    let (program, args) = argv.split_first().context("Command is empty")?;
    let status = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status();

    tokio::time::timeout(limit, status)
        .await
        .with_context(|| format!("'{program}' did not finish within {limit:?}"))?
        .with_context(|| format!("Failed to run '{program}'"))
}

/// Like [`run_status`], but a non-zero exit is an error
///
/// # Errors
///
/// Returns an error if the command fails to run, times out or exits non-zero
pub async fn run_checked(argv: &[String], limit: Duration) -> Result<()> {
    let status = run_status(argv, limit).await?;
    anyhow::ensure!(status.success(), "'{}' exited with {status}", argv[0]);
    Ok(())
}
