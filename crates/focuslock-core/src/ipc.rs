use anyhow::Result;
use chrono::{DateTime, Utc};
use focuslock_ml::Classification;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::Mutex,
};

use crate::session_clock::SessionState;

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcRequest {
    Status,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcResponse {
    Status(StatusSnapshot),
    Shutdown,
}

/// What the daemon currently believes about the user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub current_process: Option<String>,
    pub current_title: Option<String>,
    pub classification: Option<Classification>,
    pub productive_seconds: u32,
    pub distraction_seconds: u32,
    pub is_locked: bool,
    pub break_notified: bool,
    pub paused: bool,
    pub confirmed_absent: bool,
    pub window_started_at: DateTime<Utc>,
}

impl StatusSnapshot {
    #[must_use]
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            current_process: None,
            current_title: None,
            classification: None,
            productive_seconds: session.productive_seconds,
            distraction_seconds: session.distraction_seconds,
            is_locked: session.is_locked,
            break_notified: session.break_notified,
            paused: session.paused,
            confirmed_absent: false,
            window_started_at: session.hour_start,
        }
    }
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the reply
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Daemon side of the IPC channel; subscribes to status updates
pub struct DaemonIpcHandler {
    status: Mutex<StatusSnapshot>,
    shutdown_signal: Arc<AtomicBool>,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(shutdown_signal: Arc<AtomicBool>, initial: StatusSnapshot) -> Self {
        Self {
            status: Mutex::new(initial),
            shutdown_signal,
        }
    }

    pub async fn publish(&self, snapshot: StatusSnapshot) {
        *self.status.lock().await = snapshot;
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.status.lock().await.clone()
    }

    /// Answer a request
    pub async fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => IpcResponse::Status(self.snapshot().await),
            IpcRequest::Shutdown => {
                log::info!("Shutdown requested over IPC");
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request).await;
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

/// Accept IPC connections until the task is dropped
///
/// # Errors
///
/// Returns an error if the socket cannot be bound
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    if let Some(parent) = sock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0; 1024];
                    match stream.read(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf[..n]) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> StatusSnapshot {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut session = SessionState::new(start);
        session.distraction_seconds = 42;
        StatusSnapshot::from_session(&session)
    }

    #[tokio::test]
    async fn test_shutdown_request_sets_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let handler = DaemonIpcHandler::new(flag.clone(), snapshot());
        let response = handler.respond(IpcRequest::Shutdown).await;
        assert!(matches!(response, IpcResponse::Shutdown));
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_status_returns_latest_published_snapshot() {
        let handler = DaemonIpcHandler::new(Arc::new(AtomicBool::new(false)), snapshot());
        let mut updated = snapshot();
        updated.is_locked = true;
        updated.classification = Some(Classification::Distracting);
        handler.publish(updated.clone()).await;

        match handler.respond(IpcRequest::Status).await {
            IpcResponse::Status(status) => assert_eq!(status, updated),
            IpcResponse::Shutdown => panic!("expected status"),
        }
    }

    #[tokio::test]
    async fn test_client_server_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("focuslock.sock");
        let handler = Arc::new(DaemonIpcHandler::new(
            Arc::new(AtomicBool::new(false)),
            snapshot(),
        ));

        let server_path = sock_path.clone();
        let server = tokio::spawn(async move { listen(handler, &server_path).await });

        // Wait for bind
        for _ in 0..50 {
            if sock_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let client = IpcClient::new(&sock_path);
        match client.send_command(IpcRequest::Status).await.unwrap() {
            IpcResponse::Status(status) => assert_eq!(status.distraction_seconds, 42),
            IpcResponse::Shutdown => panic!("expected status"),
        }
        server.abort();
    }
}
