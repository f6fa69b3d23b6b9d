/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use chrono::Local;
use focuslock_core::{
    ipc::{IpcClient, IpcRequest, IpcResponse, StatusSnapshot},
    Config, Daemon, DaemonControl,
};
use std::{
    env, fs,
    path::Path,
    process::{Command, Stdio},
    thread::sleep,
    time,
};
use sysinfo::{Pid, Signal, System};

use super::helpers::{format_duration, truncate_str};

/// PID of the background daemon if it is still alive
fn running_pid(control: &DaemonControl) -> Option<u32> {
    let pid = match control.read_pid() {
        Ok(Some(pid)) => pid,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("{e:#}");
            return None;
        }
    };
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid)).then_some(pid)
}

pub fn start_daemon(control: &DaemonControl, config_path: Option<&Path>) -> Result<()> {
    // 1. Check if daemon is already running
    if let Some(pid) = running_pid(control) {
        log::info!("Daemon is already running (PID: {pid}).");
        return Ok(());
    }
    if control.pid_path().exists() || control.sock_path().exists() {
        log::warn!("Removing stale PID/socket files.");
        control.remove_runtime_files()?;
    }

    // 2. Fail here rather than in the detached process
    Config::load(config_path)?;

    log::info!("Starting FocusLock daemon...");

    // 3. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let mut command = Command::new(current_exe);
    command.arg("daemon-internal-start");
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }
    let child = command
        .current_dir(env::current_dir()?)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;

    // 4. In parent process, write PID and exit
    log::info!("Daemon process started with PID: {}", child.id());
    control.write_pid(child.id())?;
    log::info!("Logs: {}", control.log_path().display());

    Ok(())
}

pub async fn run_daemon_process(control: &DaemonControl, config_path: Option<&Path>) -> Result<()> {
    // This is the detached daemon process
    setup_daemon_logging(control)?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic(control, config_path).await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

pub async fn run_foreground(control: &DaemonControl, config_path: Option<&Path>) -> Result<()> {
    if let Some(pid) = running_pid(control) {
        anyhow::bail!("A background daemon is already running (PID: {pid}); stop it first");
    }
    log::info!("Running in the foreground, press Ctrl-C to stop.");
    daemon_main_logic(control, config_path).await
}

async fn daemon_main_logic(control: &DaemonControl, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let mut daemon = Daemon::new(config).await?;
    let result = daemon.run_with_signals(&control.sock_path()).await;
    drop(daemon);

    if let Err(e) = control.remove_runtime_files() {
        log::warn!("Failed to clean up runtime files: {e:#}");
    }
    result
}

pub async fn stop_daemon(control: &DaemonControl) -> Result<()> {
    let Some(pid) = control.read_pid()? else {
        log::info!("Daemon is not running (no PID file).");
        control.remove_runtime_files()?;
        return Ok(());
    };

    log::info!("Stopping FocusLock daemon (PID: {pid})...");
    let client = IpcClient::new(&control.sock_path());

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));
            if stop_if_alive(pid) {
                log::warn!("Daemon did not stop gracefully. Forced it to stop.");
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            if stop_if_alive(pid) {
                log::info!("Process stopped.");
            }
        }
    }

    control.remove_runtime_files()?;
    Ok(())
}

/// Stop `pid` if it still exists, returning whether it had to.
///
/// SIGTERM first so the daemon can release the camera and overlay; SIGKILL
/// only if it is still around afterwards.
fn stop_if_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    if !sys.refresh_process(pid) {
        return false;
    }
    if let Some(process) = sys.process(pid) {
        if process.kill_with(Signal::Term).is_none() {
            process.kill();
            return true;
        }
    }

    sleep(time::Duration::from_secs(2));
    if sys.refresh_process(pid) {
        log::warn!("Daemon ignored SIGTERM, killing it.");
        if let Some(process) = sys.process(pid) {
            process.kill();
        }
    }
    true
}

pub async fn show_status(control: &DaemonControl) -> Result<()> {
    let sock_path = control.sock_path();

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status(status)) => print_status(&status),
        Ok(IpcResponse::Shutdown) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn tracking_state(status: &StatusSnapshot) -> &'static str {
    if status.paused {
        "paused (system idle or asleep)"
    } else if status.confirmed_absent {
        "paused (user away)"
    } else {
        "active"
    }
}

fn print_status(status: &StatusSnapshot) {
    println!("Daemon Status: Running");
    println!("Tracking: {}", tracking_state(status));

    println!("\nCurrent Activity:");
    println!(
        "  Process: {}",
        status.current_process.as_deref().unwrap_or("None")
    );
    println!(
        "  Window: {}",
        status
            .current_title
            .as_deref()
            .map_or_else(|| "None".to_string(), |t| truncate_str(t, 60))
    );
    println!(
        "  Classification: {}",
        status
            .classification
            .map_or_else(|| "None".to_string(), |c| c.to_string())
    );

    println!(
        "\nWindow started: {}",
        status
            .window_started_at
            .with_timezone(&Local)
            .format("%H:%M:%S")
    );
    println!("  Productive: {}", format_duration(status.productive_seconds));
    println!("  Distracted: {}", format_duration(status.distraction_seconds));
    println!(
        "  Overlay: {}",
        if status.is_locked { "locked" } else { "clear" }
    );
    println!(
        "  Break reminder: {}",
        if status.break_notified { "sent" } else { "pending" }
    );
}

fn setup_daemon_logging(control: &DaemonControl) -> Result<()> {
    use std::fs::OpenOptions;

    fs::create_dir_all(control.data_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(control.log_path())?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use focuslock_core::SessionState;

    fn status() -> StatusSnapshot {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        StatusSnapshot::from_session(&SessionState::new(start))
    }

    #[test]
    fn test_tracking_state_prefers_pause() {
        let mut s = status();
        assert_eq!(tracking_state(&s), "active");
        s.confirmed_absent = true;
        assert_eq!(tracking_state(&s), "paused (user away)");
        s.paused = true;
        assert_eq!(tracking_state(&s), "paused (system idle or asleep)");
    }

    #[test]
    fn test_running_pid_without_pid_file() {
        let dir = std::env::temp_dir().join(format!("focuslock-cli-test-{}", std::process::id()));
        let control = DaemonControl::new(&dir);
        assert_eq!(running_pid(&control), None);
    }
}
