use crate::{
    capture::{create_presence_source, CaptureGuard},
    classifier::{ActivitySample, ClassificationGateway},
    config::Config,
    intervention::{DesktopSink, InterventionSink},
    ipc::{listen, DaemonIpcHandler, StatusSnapshot},
    monitor::{create_monitor, ActiveWindow, SystemMonitor},
    power::{spawn_power_listener, PowerEvent},
    presence::PresenceGate,
    session_clock::{ClockEvent, Intervention, SessionClock, SessionState},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use focuslock_ml::Classification;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::mpsc,
    time::{interval, Interval, MissedTickBehavior},
};

const POWER_EVENT_BUFFER: usize = 16;

/// Owns all mutable monitoring state and drives it from one task, so window,
/// idle, presence and power updates are applied strictly one after another.
pub struct Daemon {
    config: Config,
    monitor: Box<dyn SystemMonitor>,
    gateway: ClassificationGateway,
    clock: SessionClock,
    session: SessionState,
    presence: PresenceGate,
    capture: CaptureGuard,
    sink: Arc<dyn InterventionSink>,
    power_tx: mpsc::Sender<PowerEvent>,
    power_rx: mpsc::Receiver<PowerEvent>,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<AtomicBool>,
    system_idle: bool,
    system_asleep: bool,
    current_window: Option<ActiveWindow>,
    last_classification: Option<Classification>,
}

impl Daemon {
    /// Build a daemon with the platform monitor, desktop sink and configured
    /// presence probe. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported or the config yields an
    /// invalid classifier
    pub async fn new(config: Config) -> Result<Self> {
        let monitor = create_monitor()?;
        let gateway = ClassificationGateway::from_config(&config)?;
        let source = create_presence_source(&config.presence, config.schedule.presence_timeout());
        let capture = CaptureGuard::acquire(source).await;
        let sink: Arc<dyn InterventionSink> = Arc::new(DesktopSink::new(config.overlay.clone()));

        let daemon = Self::with_components(config, monitor, gateway, capture, sink, Utc::now());
        spawn_power_listener(daemon.power_tx.clone());
        Ok(daemon)
    }

    /// Assemble a daemon from explicit collaborators
    #[must_use]
    pub fn with_components(
        config: Config,
        monitor: Box<dyn SystemMonitor>,
        gateway: ClassificationGateway,
        capture: CaptureGuard,
        sink: Arc<dyn InterventionSink>,
        now: DateTime<Utc>,
    ) -> Self {
        let session = SessionState::new(now);
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let ipc_handler = Arc::new(DaemonIpcHandler::new(
            shutdown_signal.clone(),
            StatusSnapshot::from_session(&session),
        ));
        let (power_tx, power_rx) = mpsc::channel(POWER_EVENT_BUFFER);

        Self {
            clock: SessionClock::new(config.thresholds),
            presence: PresenceGate::from_secs(config.thresholds.absence_debounce_secs),
            config,
            monitor,
            gateway,
            session,
            capture,
            sink,
            power_tx,
            power_rx,
            ipc_handler,
            shutdown_signal,
            system_idle: false,
            system_asleep: false,
            current_window: None,
            last_classification: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn presence(&self) -> &PresenceGate {
        &self.presence
    }

    fn timer(period: std::time::Duration) -> Interval {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// Run until Ctrl-C, SIGTERM or an IPC shutdown request
    ///
    /// # Errors
    ///
    /// Returns an error if the SIGTERM handler cannot be installed; transient
    /// failures while running are logged and skipped
    pub async fn run_with_signals(&mut self, sock_path: &Path) -> Result<()> {
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        let ipc_handler = self.ipc_handler.clone();
        let sock_path = sock_path.to_path_buf();
        let ipc_task = tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let schedule = &self.config.schedule;
        let mut window_timer = Self::timer(schedule.window_poll());
        let mut idle_timer = Self::timer(schedule.idle_poll());
        let mut presence_timer = Self::timer(schedule.presence_poll());
        log::info!(
            "Daemon started (window poll {}s, idle poll {}s, presence poll {}ms)",
            schedule.window_poll_secs,
            schedule.idle_poll_secs,
            schedule.presence_poll_ms
        );

        loop {
            tokio::select! {
                _ = presence_timer.tick() => self.poll_presence(Utc::now()).await,
                _ = idle_timer.tick() => self.poll_idle(Utc::now()).await,
                _ = window_timer.tick() => self.poll_window(Utc::now()).await,
                Some(event) = self.power_rx.recv() => {
                    self.handle_power_event(event, Utc::now()).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
                _ = terminate.recv() => {
                    log::info!("Received SIGTERM, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        ipc_task.abort();
        self.shutdown().await;
        Ok(())
    }

    /// Classify the foreground window and advance the session clock
    pub async fn poll_window(&mut self, now: DateTime<Utc>) {
        if self.session.paused {
            return;
        }

        let window = match self.monitor.get_active_window().await {
            Ok(Some(window)) => window,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Active window query failed, skipping tick: {e:#}");
                return;
            }
        };

        let sample = ActivitySample::from_window(&window, now);
        let result = self.gateway.classify_full(&sample).await;
        log::debug!(
            "Active window: {} - {:?} -> {} ({:?})",
            sample.process_name,
            sample.window_title,
            result.classification,
            result.source
        );

        let event = ClockEvent::Tick {
            classification: result.classification,
            confirmed_absent: self.presence.confirmed_absent(),
            delta_secs: self.config.schedule.tick_seconds(),
        };
        let interventions = self.clock.apply(&mut self.session, event, now);

        self.current_window = Some(window);
        self.last_classification = Some(result.classification);
        self.dispatch_all(interventions).await;
        self.publish_status().await;
    }

    /// Pause accrual while the system is idle
    pub async fn poll_idle(&mut self, now: DateTime<Utc>) {
        let threshold = self.config.schedule.idle_threshold_secs;
        match self.monitor.is_idle(threshold).await {
            Ok(idle) if idle != self.system_idle => {
                self.system_idle = idle;
                if idle {
                    log::info!("System idle for {threshold}s or more");
                } else {
                    log::info!("System active again");
                }
                self.refresh_pause(now).await;
            }
            Ok(_) => {}
            Err(e) => log::debug!("Idle query failed, keeping previous state: {e:#}"),
        }
    }

    /// Feed one presence reading through the debounce gate
    pub async fn poll_presence(&mut self, now: DateTime<Utc>) {
        if self.system_asleep {
            return;
        }

        match self.capture.is_present().await {
            Ok(present) => {
                let was_absent = self.presence.confirmed_absent();
                if self.presence.update(present, now) != was_absent {
                    self.publish_status().await;
                }
            }
            Err(e) => log::debug!("Presence read failed, keeping last state: {e:#}"),
        }
    }

    pub async fn handle_power_event(&mut self, event: PowerEvent, now: DateTime<Utc>) {
        match event {
            PowerEvent::Suspend => {
                log::info!("System is suspending");
                self.system_asleep = true;
                self.capture.release().await;
            }
            PowerEvent::Resume => {
                log::info!("System resumed");
                self.system_asleep = false;
                self.capture.reacquire().await;
            }
        }
        self.refresh_pause(now).await;
    }

    async fn refresh_pause(&mut self, now: DateTime<Utc>) {
        let paused = self.system_idle || self.system_asleep;
        let interventions = self
            .clock
            .apply(&mut self.session, ClockEvent::PauseChanged(paused), now);
        self.dispatch_all(interventions).await;
        self.publish_status().await;
    }

    async fn dispatch_all(&self, interventions: Vec<Intervention>) {
        for intervention in interventions {
            log::info!("Intervention: {intervention:?}");
            // Session state stays authoritative even if the user never saw it
            if let Err(e) = self.sink.dispatch(&intervention).await {
                log::warn!("Failed to dispatch {intervention:?}: {e:#}");
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            current_process: self.current_window.as_ref().map(|w| w.process_name.clone()),
            current_title: self.current_window.as_ref().map(|w| w.title.clone()),
            classification: self.last_classification,
            confirmed_absent: self.presence.confirmed_absent(),
            ..StatusSnapshot::from_session(&self.session)
        }
    }

    async fn publish_status(&self) {
        self.ipc_handler.publish(self.status()).await;
    }

    /// Release the overlay and the capture device
    pub async fn shutdown(&mut self) {
        if self.session.is_locked {
            self.dispatch_all(vec![Intervention::UnlockOverlay]).await;
        }
        self.capture.release().await;
        log::info!(
            "Daemon shut down gracefully (productive: {}s, distracted: {}s)",
            self.session.productive_seconds,
            self.session.distraction_seconds
        );
    }
}
