mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use focuslock_core::DaemonControl;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "focuslock")]
#[command(about = "Focus monitor and distraction lock", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the monitoring daemon in the background
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the monitoring daemon
    Stop,
    /// Show what the daemon currently sees
    Status,
    /// Run the monitor in the foreground
    Run,
    /// Classify a window once and print the result
    Classify {
        /// Process name, e.g. "chrome"
        process: String,
        /// Window title
        title: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let control = DaemonControl::from_default_dir()?;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(&control, config_path),
        Commands::DaemonInternalStart => {
            commands::daemon::run_daemon_process(&control, config_path).await
        }
        Commands::Stop => commands::daemon::stop_daemon(&control).await,
        Commands::Status => commands::daemon::show_status(&control).await,
        Commands::Run => commands::daemon::run_foreground(&control, config_path).await,
        Commands::Classify { process, title } => {
            commands::classify::classify_once(config_path, &process, &title).await
        }
        Commands::Config => commands::config::show_config(config_path),
    }
}
