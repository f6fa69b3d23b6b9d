use chrono::{DateTime, Duration, Utc};
use focuslock_ml::Classification;
use serde::{Deserialize, Serialize};

/// Timing thresholds of the rolling window, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub window_secs: u32,
    pub distraction_lock_secs: u32,
    pub productive_break_secs: u32,
    pub absence_debounce_secs: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            distraction_lock_secs: 600,
            productive_break_secs: 3300,
            absence_debounce_secs: 10,
        }
    }
}

/// Side effect requested by the session clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intervention {
    LockOverlay,
    UnlockOverlay,
    Notify(String),
}

/// Accumulators and intervention flags for the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub hour_start: DateTime<Utc>,
    pub productive_seconds: u32,
    pub distraction_seconds: u32,
    pub is_locked: bool,
    pub break_notified: bool,
    pub paused: bool,
}

impl SessionState {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            hour_start: now,
            productive_seconds: 0,
            distraction_seconds: 0,
            is_locked: false,
            break_notified: false,
            paused: false,
        }
    }

    #[must_use]
    pub fn accumulated_seconds(&self) -> u32 {
        self.productive_seconds + self.distraction_seconds
    }
}

/// Input to the session clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One classified sample worth `delta_secs` of wall time
    Tick {
        classification: Classification,
        confirmed_absent: bool,
        delta_secs: u32,
    },
    /// System idle/sleep state changed
    PauseChanged(bool),
}

/// Rolling-window accumulator and threshold state machine.
///
/// Wall clock (`now - hour_start`) decides when the window rolls over. The
/// accumulator sum is only a guard: if it reaches the window length first the
/// window is reset as well and a warning is logged.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    thresholds: Thresholds,
}

impl SessionClock {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Apply an event in place, returning the interventions it triggered
    pub fn apply(
        &self,
        state: &mut SessionState,
        event: ClockEvent,
        now: DateTime<Utc>,
    ) -> Vec<Intervention> {
        match event {
            ClockEvent::PauseChanged(paused) => {
                if state.paused != paused {
                    log::info!(
                        "Session clock {}",
                        if paused { "paused" } else { "resumed" }
                    );
                }
                state.paused = paused;
                Vec::new()
            }
            ClockEvent::Tick {
                classification,
                confirmed_absent,
                delta_secs,
            } => self.tick(state, classification, confirmed_absent, delta_secs, now),
        }
    }

    /// Pure form of [`SessionClock::apply`]
    #[must_use]
    pub fn reduce(
        &self,
        mut state: SessionState,
        event: ClockEvent,
        now: DateTime<Utc>,
    ) -> (SessionState, Vec<Intervention>) {
        let interventions = self.apply(&mut state, event, now);
        (state, interventions)
    }

    fn tick(
        &self,
        state: &mut SessionState,
        classification: Classification,
        confirmed_absent: bool,
        delta_secs: u32,
        now: DateTime<Utc>,
    ) -> Vec<Intervention> {
        if state.paused || confirmed_absent {
            return Vec::new();
        }

        let mut interventions = Vec::new();
        let window = self.thresholds.window_secs;

        if now.signed_duration_since(state.hour_start) > Duration::seconds(i64::from(window)) {
            log::info!(
                "Window rolled over (productive: {}s, distracted: {}s)",
                state.productive_seconds,
                state.distraction_seconds
            );
            Self::reset_window(state, now, &mut interventions);
        } else if state.accumulated_seconds() >= window {
            log::warn!(
                "Accumulators reached {}s before the wall-clock window ended, resetting",
                state.accumulated_seconds()
            );
            Self::reset_window(state, now, &mut interventions);
        }

        let delta = delta_secs.min(window.saturating_sub(state.accumulated_seconds()));

        match classification {
            Classification::Distracting => {
                state.distraction_seconds += delta;
                if state.distraction_seconds >= self.thresholds.distraction_lock_secs
                    && !state.is_locked
                {
                    state.is_locked = true;
                    interventions.push(Intervention::LockOverlay);
                    interventions.push(Intervention::Notify(self.distraction_message()));
                }
            }
            Classification::Productive => {
                state.productive_seconds += delta;
                if state.productive_seconds >= self.thresholds.productive_break_secs
                    && !state.break_notified
                {
                    state.break_notified = true;
                    interventions.push(Intervention::Notify(self.break_message()));
                }
                if state.is_locked {
                    state.is_locked = false;
                    interventions.push(Intervention::UnlockOverlay);
                }
            }
        }

        interventions
    }

    fn reset_window(
        state: &mut SessionState,
        now: DateTime<Utc>,
        interventions: &mut Vec<Intervention>,
    ) {
        if state.is_locked {
            interventions.push(Intervention::UnlockOverlay);
        }
        *state = SessionState {
            paused: state.paused,
            ..SessionState::new(now)
        };
    }

    fn distraction_message(&self) -> String {
        format!(
            "You've been distracted for {}+ minutes. Refocus now!",
            self.thresholds.distraction_lock_secs / 60
        )
    }

    fn break_message(&self) -> String {
        format!(
            "Great job! You've focused for {} minutes. Take a 5-10 min break.",
            self.thresholds.productive_break_secs / 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        start() + Duration::seconds(secs)
    }

    fn tick(classification: Classification) -> ClockEvent {
        ClockEvent::Tick {
            classification,
            confirmed_absent: false,
            delta_secs: 1,
        }
    }

    /// Feed `count` one-second ticks starting after `*elapsed`
    fn run(
        clock: &SessionClock,
        state: &mut SessionState,
        elapsed: &mut i64,
        classification: Classification,
        count: usize,
    ) -> Vec<Intervention> {
        let mut all = Vec::new();
        for _ in 0..count {
            *elapsed += 1;
            all.extend(clock.apply(state, tick(classification), at(*elapsed)));
        }
        all
    }

    fn count_of(interventions: &[Intervention], wanted: &Intervention) -> usize {
        interventions.iter().filter(|i| *i == wanted).count()
    }

    #[test]
    fn test_lock_fires_once_at_threshold() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut elapsed = 0;

        let before = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 599);
        assert!(before.is_empty());
        assert!(!state.is_locked);

        let crossing = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 1);
        assert!(state.is_locked);
        assert_eq!(crossing.len(), 2);
        assert_eq!(crossing[0], Intervention::LockOverlay);
        assert!(matches!(&crossing[1], Intervention::Notify(msg) if msg.contains("10+ minutes")));

        let after = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 1000);
        assert_eq!(count_of(&after, &Intervention::LockOverlay), 0);
        assert!(after.is_empty());
        assert!(state.is_locked);
    }

    #[test]
    fn test_single_productive_tick_unlocks() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut elapsed = 0;
        run(&clock, &mut state, &mut elapsed, Classification::Distracting, 700);
        assert!(state.is_locked);

        let unlock = run(&clock, &mut state, &mut elapsed, Classification::Productive, 1);
        assert_eq!(unlock, vec![Intervention::UnlockOverlay]);
        assert!(!state.is_locked);
        assert_eq!(state.distraction_seconds, 700);

        // Further productive ticks do not re-send the unlock
        let more = run(&clock, &mut state, &mut elapsed, Classification::Productive, 10);
        assert!(more.is_empty());
    }

    #[test]
    fn test_relock_after_unlock_while_still_over_threshold() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut elapsed = 0;
        run(&clock, &mut state, &mut elapsed, Classification::Distracting, 600);
        run(&clock, &mut state, &mut elapsed, Classification::Productive, 1);

        let relock = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 1);
        assert_eq!(count_of(&relock, &Intervention::LockOverlay), 1);
        assert!(state.is_locked);
    }

    #[test]
    fn test_break_notification_fires_once() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut elapsed = 0;

        let before = run(&clock, &mut state, &mut elapsed, Classification::Productive, 3299);
        assert!(before.is_empty());

        let crossing = run(&clock, &mut state, &mut elapsed, Classification::Productive, 1);
        assert_eq!(crossing.len(), 1);
        assert!(matches!(&crossing[0], Intervention::Notify(msg) if msg.contains("55 minutes")));
        assert!(state.break_notified);

        let after = run(&clock, &mut state, &mut elapsed, Classification::Productive, 200);
        assert!(after.is_empty());
    }

    #[test]
    fn test_accumulators_never_exceed_window() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut resets = 0;

        for i in 1..=10_000_i64 {
            let classification = if i % 7 < 3 {
                Classification::Distracting
            } else {
                Classification::Productive
            };
            let before = state.hour_start;
            let event = ClockEvent::Tick {
                classification,
                confirmed_absent: false,
                delta_secs: 2,
            };
            // Accumulators advance twice as fast as wall clock here
            clock.apply(&mut state, event, at(i));
            if state.hour_start != before {
                resets += 1;
            }
            assert!(state.accumulated_seconds() <= 3600);
        }
        assert!(resets > 0);
    }

    #[test]
    fn test_full_window_resets_on_next_tick() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let mut elapsed = 0;

        run(&clock, &mut state, &mut elapsed, Classification::Productive, 3000);
        run(&clock, &mut state, &mut elapsed, Classification::Distracting, 600);
        assert_eq!(state.accumulated_seconds(), 3600);

        run(&clock, &mut state, &mut elapsed, Classification::Productive, 1);
        assert_eq!(state.productive_seconds, 1);
        assert_eq!(state.distraction_seconds, 0);
        assert!(!state.break_notified);
        assert_eq!(state.hour_start, at(3601));
    }

    #[test]
    fn test_accumulator_guard_resets_without_wall_clock_progress() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let event = ClockEvent::Tick {
            classification: Classification::Productive,
            confirmed_absent: false,
            delta_secs: 600,
        };

        for _ in 0..6 {
            clock.apply(&mut state, event, at(10));
        }
        assert_eq!(state.productive_seconds, 3600);

        clock.apply(&mut state, event, at(11));
        assert_eq!(state.productive_seconds, 600);
        assert_eq!(state.hour_start, at(11));
    }

    #[test]
    fn test_delta_is_clamped_to_window_bound() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        state.productive_seconds = 3599;
        state.break_notified = true;

        let event = ClockEvent::Tick {
            classification: Classification::Productive,
            confirmed_absent: false,
            delta_secs: 2,
        };
        clock.apply(&mut state, event, at(100));
        assert_eq!(state.productive_seconds, 3600);
    }

    #[test]
    fn test_reset_takes_priority_over_threshold_check() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        state.distraction_seconds = 599;

        // Past the window: accumulators are zeroed before the new sample counts
        let interventions = clock.apply(&mut state, tick(Classification::Distracting), at(3601));
        assert!(interventions.is_empty());
        assert_eq!(state.distraction_seconds, 1);
        assert!(!state.is_locked);
    }

    #[test]
    fn test_reset_while_locked_releases_overlay() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        state.distraction_seconds = 900;
        state.is_locked = true;

        let interventions = clock.apply(&mut state, tick(Classification::Distracting), at(3700));
        assert_eq!(interventions, vec![Intervention::UnlockOverlay]);
        assert!(!state.is_locked);
        assert_eq!(state.distraction_seconds, 1);
    }

    #[test]
    fn test_paused_ticks_do_not_accrue() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        clock.apply(&mut state, ClockEvent::PauseChanged(true), at(0));

        let mut elapsed = 0;
        let out = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 900);
        assert!(out.is_empty());
        assert_eq!(state.accumulated_seconds(), 0);

        clock.apply(&mut state, ClockEvent::PauseChanged(false), at(elapsed));
        run(&clock, &mut state, &mut elapsed, Classification::Distracting, 5);
        assert_eq!(state.distraction_seconds, 5);
    }

    #[test]
    fn test_confirmed_absence_vetoes_accrual() {
        let clock = SessionClock::new(Thresholds::default());
        let mut state = SessionState::new(start());
        let event = ClockEvent::Tick {
            classification: Classification::Distracting,
            confirmed_absent: true,
            delta_secs: 1,
        };
        for i in 1..=700 {
            assert!(clock.apply(&mut state, event, at(i)).is_empty());
        }
        assert_eq!(state.distraction_seconds, 0);
        assert!(!state.is_locked);
    }

    #[test]
    fn test_pause_survives_window_reset() {
        let mut state = SessionState::new(start());
        state.productive_seconds = 3600;
        let mut out = Vec::new();
        SessionClock::reset_window(&mut state, at(5000), &mut out);
        assert!(out.is_empty());
        assert_eq!(state.accumulated_seconds(), 0);

        state.paused = true;
        SessionClock::reset_window(&mut state, at(9000), &mut out);
        assert!(state.paused);
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let clock = SessionClock::new(Thresholds::default());
        let state = SessionState::new(start());
        let (next, interventions) = clock.reduce(state, tick(Classification::Productive), at(1));
        assert_eq!(state.productive_seconds, 0);
        assert_eq!(next.productive_seconds, 1);
        assert!(interventions.is_empty());
    }

    #[test]
    fn test_custom_thresholds_shape_messages() {
        let clock = SessionClock::new(Thresholds {
            window_secs: 1800,
            distraction_lock_secs: 300,
            productive_break_secs: 1500,
            absence_debounce_secs: 5,
        });
        let mut state = SessionState::new(start());
        let mut elapsed = 0;
        let out = run(&clock, &mut state, &mut elapsed, Classification::Distracting, 300);
        assert!(matches!(&out[1], Intervention::Notify(msg) if msg.contains("5+ minutes")));
    }
}
