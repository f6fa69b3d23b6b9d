use tokio::sync::mpsc;

/// System sleep transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    Suspend,
    Resume,
}

/// Start forwarding OS sleep/wake notifications into `tx`.
///
/// Must be called from inside a tokio runtime. Platforms without a listener
/// rely on the idle poll alone.
pub fn spawn_power_listener(tx: mpsc::Sender<PowerEvent>) {
    #[cfg(target_os = "linux")]
    {
        tokio::spawn(async move {
            if let Err(e) = logind::listen_for_sleep(tx).await {
                log::warn!("logind sleep listener unavailable: {e}");
            }
        });
    }

    #[cfg(not(target_os = "linux"))]
    {
        drop(tx);
        log::debug!("No sleep/wake listener on this platform");
    }
}

#[cfg(target_os = "linux")]
mod logind {
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use zbus::{Connection, Proxy};

    use super::PowerEvent;

    /// Map a `PrepareForSleep(start)` argument to an event
    pub(super) fn event_for(going_down: bool) -> PowerEvent {
        if going_down {
            PowerEvent::Suspend
        } else {
            PowerEvent::Resume
        }
    }

    pub(super) async fn listen_for_sleep(tx: mpsc::Sender<PowerEvent>) -> zbus::Result<()> {
        let connection = Connection::system().await?;
        let proxy = Proxy::new(
            &connection,
            "org.freedesktop.login1",
            "/org/freedesktop/login1",
            "org.freedesktop.login1.Manager",
        )
        .await?;

        let mut stream = proxy.receive_signal("PrepareForSleep").await?;
        log::info!("Listening for logind sleep signals");

        while let Some(message) = stream.next().await {
            let going_down: bool = match message.body().deserialize() {
                Ok(v) => v,
                Err(e) => {
                    log::debug!("Ignoring malformed PrepareForSleep signal: {e}");
                    continue;
                }
            };
            if tx.send(event_for(going_down)).await.is_err() {
                // Daemon is gone
                break;
            }
        }
        Ok(())
    }
}
