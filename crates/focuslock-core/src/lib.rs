pub mod capture;
pub mod classifier;
pub mod command;
pub mod config;
pub mod daemon;
pub mod daemon_control;
pub mod intervention;
pub mod ipc;
pub mod monitor;
pub mod power;
pub mod presence;
pub mod session_clock;

pub use classifier::{ActivitySample, ClassificationGateway, ClassificationResult, ClassificationSource};
pub use config::Config;
pub use daemon::Daemon;
pub use daemon_control::DaemonControl;
pub use presence::{PresenceGate, PresenceState};
pub use session_clock::{ClockEvent, Intervention, SessionClock, SessionState, Thresholds};
