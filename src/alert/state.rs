use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::posture::CompositePosture;

use super::AlertConfig;

/// Externally visible phase of the fall debounce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AlertPhase {
    #[default]
    Idle,
    FallPending,
    FallConfirmed,
    RecoverPending,
}

impl AlertPhase {
    pub fn alarm_active(&self) -> bool {
        matches!(self, AlertPhase::FallConfirmed | AlertPhase::RecoverPending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClearReason {
    Recovered,
    Sleeping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AlertEvent {
    AlarmRaised,
    AlarmCleared {
        reason: ClearReason,
    },
    #[serde(rename_all = "camelCase")]
    SustainedActivity {
        posture: CompositePosture,
        duration_secs: u64,
    },
}

/// Debounce timers carry the time observed so far rather than a start instant,
/// so frames without a person can pause them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Debounce {
    Idle,
    FallPending { elapsed: Duration },
    FallConfirmed,
    RecoverPending { elapsed: Duration },
}

impl Debounce {
    fn phase(&self) -> AlertPhase {
        match self {
            Debounce::Idle => AlertPhase::Idle,
            Debounce::FallPending { .. } => AlertPhase::FallPending,
            Debounce::FallConfirmed => AlertPhase::FallConfirmed,
            Debounce::RecoverPending { .. } => AlertPhase::RecoverPending,
        }
    }
}

/// Everything the alert logic remembers between frames.
#[derive(Debug, Clone)]
pub struct AlertSession {
    config: AlertConfig,
    debounce: Debounce,
    last_posture: Option<CompositePosture>,
    /// Observed time in the current streak; only grows for standing/sitting.
    streak_elapsed: Duration,
    warning_issued: bool,
    /// `None` after a frame without a person, which makes the next observation
    /// contribute no elapsed time.
    last_observed_at: Option<Instant>,
}

impl AlertSession {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            debounce: Debounce::Idle,
            last_posture: None,
            streak_elapsed: Duration::ZERO,
            warning_issued: false,
            last_observed_at: None,
        }
    }

    pub fn phase(&self) -> AlertPhase {
        self.debounce.phase()
    }

    pub fn alarm_active(&self) -> bool {
        self.phase().alarm_active()
    }

    pub fn last_posture(&self) -> Option<CompositePosture> {
        self.last_posture
    }

    pub fn warning_issued(&self) -> bool {
        self.warning_issued
    }

    /// Same-posture duration; always zero while fallen or sleeping.
    pub fn sustained_duration(&self) -> Duration {
        match self.last_posture {
            Some(posture) if posture.is_activity() => self.streak_elapsed,
            _ => Duration::ZERO,
        }
    }

    pub fn sustained_duration_secs(&self) -> u64 {
        self.sustained_duration().as_secs()
    }

    pub fn sustained(&self) -> bool {
        matches!(self.last_posture, Some(posture) if posture.is_activity())
            && self.streak_elapsed >= self.config.sustained_warning
    }

    /// A frame with no person in view. Nothing changes, and the time until the
    /// next observation is not counted toward any timer.
    pub fn observe_absent(&mut self) {
        self.last_observed_at = None;
    }

    pub fn observe(&mut self, posture: CompositePosture, now: Instant) -> Vec<AlertEvent> {
        let delta = self
            .last_observed_at
            .map(|previous| now.saturating_duration_since(previous))
            .unwrap_or(Duration::ZERO);
        self.last_observed_at = Some(now);

        let mut events = Vec::new();
        self.track_streak(posture, delta, &mut events);
        self.step_debounce(posture, delta, &mut events);
        self.last_posture = Some(posture);
        events
    }

    fn track_streak(
        &mut self,
        posture: CompositePosture,
        delta: Duration,
        events: &mut Vec<AlertEvent>,
    ) {
        if self.last_posture != Some(posture) {
            self.streak_elapsed = Duration::ZERO;
            self.warning_issued = false;
        } else if posture.is_activity() {
            self.streak_elapsed = self.streak_elapsed.saturating_add(delta);
        }

        if posture.is_activity()
            && !self.warning_issued
            && self.streak_elapsed >= self.config.sustained_warning
        {
            self.warning_issued = true;
            events.push(AlertEvent::SustainedActivity {
                posture,
                duration_secs: self.streak_elapsed.as_secs(),
            });
        }
    }

    fn step_debounce(
        &mut self,
        posture: CompositePosture,
        delta: Duration,
        events: &mut Vec<AlertEvent>,
    ) {
        let was_active = self.alarm_active();

        let next = match posture {
            // Sleeping is a safe state on its own; no recovery window.
            CompositePosture::Sleeping(_) => Debounce::Idle,
            CompositePosture::Fallen => match self.debounce {
                Debounce::Idle => Debounce::FallPending {
                    elapsed: Duration::ZERO,
                },
                Debounce::FallPending { elapsed } => Debounce::FallPending {
                    elapsed: elapsed.saturating_add(delta),
                },
                // Falling again cancels a pending recovery; the alarm never went off.
                Debounce::FallConfirmed | Debounce::RecoverPending { .. } => Debounce::FallConfirmed,
            },
            CompositePosture::Standing | CompositePosture::Sitting(_) => match self.debounce {
                Debounce::Idle | Debounce::FallPending { .. } => Debounce::Idle,
                Debounce::FallConfirmed => Debounce::RecoverPending {
                    elapsed: Duration::ZERO,
                },
                Debounce::RecoverPending { elapsed } => Debounce::RecoverPending {
                    elapsed: elapsed.saturating_add(delta),
                },
            },
        };

        self.debounce = match next {
            Debounce::FallPending { elapsed } if elapsed >= self.config.fall_confirm => {
                Debounce::FallConfirmed
            }
            Debounce::RecoverPending { elapsed } if elapsed >= self.config.recover_confirm => {
                Debounce::Idle
            }
            other => other,
        };

        match (was_active, self.alarm_active()) {
            (false, true) => events.push(AlertEvent::AlarmRaised),
            (true, false) => events.push(AlertEvent::AlarmCleared {
                reason: if posture.is_sleeping() {
                    ClearReason::Sleeping
                } else {
                    ClearReason::Recovered
                },
            }),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posture::FurnitureLabel;
    use pretty_assertions::assert_eq;

    const STEP: Duration = Duration::from_millis(100);

    fn session() -> AlertSession {
        AlertSession::new(AlertConfig::default())
    }

    /// Feeds `posture` every 100ms for `frames` frames starting at `*clock`.
    fn hold(
        session: &mut AlertSession,
        posture: CompositePosture,
        clock: &mut Instant,
        frames: usize,
    ) -> Vec<(Duration, bool)> {
        let mut trace = Vec::with_capacity(frames);
        let start = *clock;
        for _ in 0..frames {
            session.observe(posture, *clock);
            trace.push((*clock - start, session.alarm_active()));
            *clock += STEP;
        }
        trace
    }

    #[test]
    fn fall_then_stand_has_hysteresis() {
        let mut session = session();
        let mut clock = Instant::now();

        let fallen = hold(&mut session, CompositePosture::Fallen, &mut clock, 7);
        for (offset, active) in &fallen {
            assert_eq!(*active, *offset >= Duration::from_millis(500), "fallen at {offset:?}");
        }

        let standing = hold(&mut session, CompositePosture::Standing, &mut clock, 7);
        for (offset, active) in &standing {
            assert_eq!(*active, *offset < Duration::from_millis(500), "standing at {offset:?}");
        }
    }

    #[test]
    fn alarm_confirms_within_window_while_held() {
        let mut session = session();
        let mut clock = Instant::now();
        let trace = hold(&mut session, CompositePosture::Fallen, &mut clock, 11);
        let first_on = trace.iter().find(|(_, active)| *active).map(|(at, _)| *at);
        assert_eq!(first_on, Some(Duration::from_millis(500)));
        assert!(trace.iter().skip(5).all(|(_, active)| *active));
    }

    #[test]
    fn sleeping_clears_alarm_immediately() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 6);
        assert!(session.alarm_active());

        let events = session.observe(CompositePosture::Sleeping(FurnitureLabel::Bed), clock);
        assert!(!session.alarm_active());
        assert_eq!(session.phase(), AlertPhase::Idle);
        assert_eq!(
            events,
            vec![AlertEvent::AlarmCleared {
                reason: ClearReason::Sleeping
            }]
        );
    }

    #[test]
    fn sleeping_never_raises_alarm() {
        let mut session = session();
        let mut clock = Instant::now();
        let trace = hold(
            &mut session,
            CompositePosture::Sleeping(FurnitureLabel::Couch),
            &mut clock,
            30,
        );
        assert!(trace.iter().all(|(_, active)| !active));
    }

    #[test]
    fn short_fall_does_not_alarm() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 4);
        hold(&mut session, CompositePosture::Standing, &mut clock, 2);
        let trace = hold(&mut session, CompositePosture::Fallen, &mut clock, 5);
        assert!(trace.iter().all(|(_, active)| !active));
    }

    #[test]
    fn refall_during_recovery_keeps_alarm_and_restarts_recovery() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 6);
        hold(&mut session, CompositePosture::Standing, &mut clock, 3);
        assert_eq!(session.phase(), AlertPhase::RecoverPending);

        session.observe(CompositePosture::Fallen, clock);
        clock += STEP;
        assert_eq!(session.phase(), AlertPhase::FallConfirmed);

        // A fresh recovery window starts from the next non-fallen frame.
        let trace = hold(&mut session, CompositePosture::Sitting(None), &mut clock, 6);
        assert!(trace[..5].iter().all(|(_, active)| *active));
        assert!(!trace[5].1);
    }

    #[test]
    fn recovery_window_spans_posture_changes() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 6);
        hold(&mut session, CompositePosture::Sitting(None), &mut clock, 3);
        let trace = hold(&mut session, CompositePosture::Standing, &mut clock, 3);
        assert!(trace[0].1 && trace[1].1);
        assert!(!trace[2].1);
    }

    #[test]
    fn emits_raise_and_recover_events_once() {
        let mut session = session();
        let mut clock = Instant::now();
        let mut events = Vec::new();
        for posture in std::iter::repeat(CompositePosture::Fallen)
            .take(8)
            .chain(std::iter::repeat(CompositePosture::Standing).take(8))
        {
            events.extend(session.observe(posture, clock));
            clock += STEP;
        }
        assert_eq!(
            events,
            vec![
                AlertEvent::AlarmRaised,
                AlertEvent::AlarmCleared {
                    reason: ClearReason::Recovered
                },
            ]
        );
    }

    #[test]
    fn absent_frames_freeze_fall_timer() {
        let mut session = session();
        let start = Instant::now();
        session.observe(CompositePosture::Fallen, start);
        session.observe(CompositePosture::Fallen, start + Duration::from_millis(300));
        session.observe_absent();

        // Five seconds with nobody in view do not count toward confirmation.
        let back = start + Duration::from_millis(5300);
        session.observe(CompositePosture::Fallen, back);
        assert_eq!(session.phase(), AlertPhase::FallPending);

        session.observe(CompositePosture::Fallen, back + Duration::from_millis(200));
        assert!(session.alarm_active());
    }

    #[test]
    fn absent_frames_freeze_recovery_window() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 6);
        assert!(session.alarm_active());

        // 0.3s of recovery observed
        hold(&mut session, CompositePosture::Standing, &mut clock, 4);
        assert_eq!(session.phase(), AlertPhase::RecoverPending);

        session.observe_absent();
        clock += Duration::from_secs(30);

        session.observe(CompositePosture::Standing, clock);
        assert!(session.alarm_active(), "gap must not count toward recovery");
        assert_eq!(session.phase(), AlertPhase::RecoverPending);

        session.observe(CompositePosture::Standing, clock + Duration::from_millis(100));
        assert!(session.alarm_active());
        let events =
            session.observe(CompositePosture::Standing, clock + Duration::from_millis(200));
        assert!(!session.alarm_active());
        assert_eq!(
            events,
            vec![AlertEvent::AlarmCleared {
                reason: ClearReason::Recovered
            }]
        );
    }

    #[test]
    fn absent_frames_keep_alarm_frozen() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 6);
        for _ in 0..50 {
            session.observe_absent();
        }
        assert!(session.alarm_active());
        assert_eq!(session.last_posture(), Some(CompositePosture::Fallen));
    }

    #[test]
    fn sustained_duration_accumulates_and_warns_once() {
        let mut session = session();
        let start = Instant::now();
        let sitting = CompositePosture::Sitting(Some(FurnitureLabel::Chair));

        let mut warnings = 0;
        for second in 0..=12u64 {
            let events = session.observe(sitting, start + Duration::from_secs(second));
            warnings += events
                .iter()
                .filter(|e| matches!(e, AlertEvent::SustainedActivity { .. }))
                .count();
            assert_eq!(session.sustained_duration_secs(), second);
            assert_eq!(session.sustained(), second >= 10);
        }
        assert_eq!(warnings, 1);
        assert!(session.warning_issued());
        assert!(!session.alarm_active());
    }

    #[test]
    fn posture_change_resets_sustained_duration() {
        let mut session = session();
        let start = Instant::now();
        for second in 0..=15u64 {
            session.observe(CompositePosture::Sitting(None), start + Duration::from_secs(second));
        }
        assert!(session.warning_issued());

        session.observe(CompositePosture::Standing, start + Duration::from_secs(16));
        assert_eq!(session.sustained_duration(), Duration::ZERO);
        assert!(!session.warning_issued());
        assert!(!session.sustained());
    }

    #[test]
    fn sitting_on_different_furniture_is_a_new_streak() {
        let mut session = session();
        let start = Instant::now();
        session.observe(CompositePosture::Sitting(Some(FurnitureLabel::Chair)), start);
        session.observe(
            CompositePosture::Sitting(Some(FurnitureLabel::Chair)),
            start + Duration::from_secs(4),
        );
        session.observe(
            CompositePosture::Sitting(Some(FurnitureLabel::Couch)),
            start + Duration::from_secs(5),
        );
        assert_eq!(session.sustained_duration_secs(), 0);
    }

    #[test]
    fn fallen_frames_do_not_accumulate_duration() {
        let mut session = session();
        let mut clock = Instant::now();
        hold(&mut session, CompositePosture::Fallen, &mut clock, 30);
        assert_eq!(session.sustained_duration(), Duration::ZERO);
        assert!(!session.sustained());
    }

    #[test]
    fn absent_frames_pause_sustained_duration() {
        let mut session = session();
        let start = Instant::now();
        session.observe(CompositePosture::Standing, start);
        session.observe(CompositePosture::Standing, start + Duration::from_secs(3));
        session.observe_absent();
        session.observe(CompositePosture::Standing, start + Duration::from_secs(60));
        assert_eq!(session.sustained_duration_secs(), 3);
    }

    #[test]
    fn zero_confirm_window_alarms_on_first_fallen_frame() {
        let config = AlertConfig {
            fall_confirm: Duration::ZERO,
            ..AlertConfig::default()
        };
        let mut session = AlertSession::new(config);
        let events = session.observe(CompositePosture::Fallen, Instant::now());
        assert_eq!(events, vec![AlertEvent::AlarmRaised]);
    }
}
