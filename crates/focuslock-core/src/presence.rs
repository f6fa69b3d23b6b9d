use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Debounce bookkeeping for the face-presence signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceState {
    pub last_seen_absent_at: Option<DateTime<Utc>>,
    pub confirmed_absent: bool,
}

/// Debounced filter over raw presence readings.
///
/// Presence is trusted instantly. Absence is only confirmed once it has lasted
/// longer than the debounce window, so blinks and camera glitches never pause
/// the timers.
#[derive(Debug, Clone)]
pub struct PresenceGate {
    state: PresenceState,
    debounce: Duration,
}

impl PresenceGate {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: PresenceState::default(),
            debounce,
        }
    }

    #[must_use]
    pub fn from_secs(debounce_secs: u32) -> Self {
        Self::new(Duration::seconds(i64::from(debounce_secs)))
    }

    /// Feed one raw reading, returning whether absence is confirmed
    pub fn update(&mut self, raw_present: bool, now: DateTime<Utc>) -> bool {
        if raw_present {
            if self.state.confirmed_absent {
                log::info!("User is back");
            }
            self.state = PresenceState::default();
            return false;
        }

        match self.state.last_seen_absent_at {
            None => self.state.last_seen_absent_at = Some(now),
            Some(since) => {
                if !self.state.confirmed_absent && now.signed_duration_since(since) > self.debounce {
                    log::info!(
                        "User absent for over {}s, pausing accrual",
                        self.debounce.num_seconds()
                    );
                    self.state.confirmed_absent = true;
                }
            }
        }
        self.state.confirmed_absent
    }

    #[must_use]
    pub fn confirmed_absent(&self) -> bool {
        self.state.confirmed_absent
    }

    #[must_use]
    pub fn state(&self) -> PresenceState {
        self.state
    }
}
