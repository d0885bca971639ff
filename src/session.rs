//! Session accumulation
//!
//! Consumes the stable attention state on a fixed tick and keeps the session
//! clock, the accumulated attentive time and the current distraction streak.
//! Paused wall-clock time is excluded from every figure.

use crate::types::{AttentionState, SessionSummary};
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: i64 = 100;

/// Mutable session counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub session_start: DateTime<Utc>,
    /// Never decreases between resets
    pub attention_accumulated: TimeDelta,
    /// `None` iff the last ticked state was attentive (or nothing ticked yet)
    pub distraction_start: Option<DateTime<Utc>>,
    pub last_tick: DateTime<Utc>,
}

impl SessionStats {
    fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            session_start: now,
            attention_accumulated: TimeDelta::zero(),
            distraction_start: None,
            last_tick: now,
        }
    }
}

/// Derived figures at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub timestamp: DateTime<Utc>,
    pub state: AttentionState,
    pub session_time: TimeDelta,
    pub attention_time: TimeDelta,
    pub attention_percentage: f64,
    pub distraction_duration: TimeDelta,
}

/// Tick-driven session accumulator
#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    session_id: String,
    stats: SessionStats,
    last_state: AttentionState,
    paused_at: Option<DateTime<Utc>>,
}

impl SessionAccumulator {
    /// Start a session at `now` with a fresh random id
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_session_id(Uuid::new_v4().to_string(), now)
    }

    pub fn with_session_id(session_id: String, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            stats: SessionStats::starting_at(now),
            last_state: AttentionState::Distracted,
            paused_at: None,
        }
    }

    /// Account for the time since the previous tick under `state`.
    ///
    /// Ignored while paused; the returned snapshot is then frozen at the pause
    /// instant.
    pub fn tick(&mut self, now: DateTime<Utc>, state: AttentionState) -> SessionSnapshot {
        if self.paused_at.is_some() {
            return self.snapshot(now);
        }

        // A clock that steps backwards contributes nothing
        let elapsed = (now - self.stats.last_tick).max(TimeDelta::zero());

        match state {
            AttentionState::Attentive => {
                self.stats.attention_accumulated += elapsed;
                self.stats.distraction_start = None;
            }
            AttentionState::Distracted => {
                if self.stats.distraction_start.is_none() {
                    self.stats.distraction_start = Some(now.max(self.stats.last_tick));
                }
            }
        }

        self.stats.last_tick = now.max(self.stats.last_tick);
        self.last_state = state;

        self.snapshot(now)
    }

    /// Derived figures at `now` without mutating anything
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let now = self.paused_at.unwrap_or(now);
        let session_time = (now - self.stats.session_start).max(TimeDelta::zero());
        let attention_time = self.stats.attention_accumulated;

        let attention_percentage = if session_time > TimeDelta::zero() {
            seconds(attention_time) / seconds(session_time) * 100.0
        } else {
            100.0
        };

        let distraction_duration = self
            .stats
            .distraction_start
            .map(|start| (now - start).max(TimeDelta::zero()))
            .unwrap_or_else(TimeDelta::zero);

        SessionSnapshot {
            timestamp: now,
            state: self.last_state,
            session_time,
            attention_time,
            attention_percentage,
            distraction_duration,
        }
    }

    /// Zero the counters and restart the session clock at `now`.
    ///
    /// Idempotent. A paused session stays paused.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.stats = SessionStats::starting_at(now);
        self.last_state = AttentionState::Distracted;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
        log::debug!("session {} reset at {}", self.session_id, now.to_rfc3339());
    }

    /// Stop accounting time. No-op if already paused.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
            log::info!("session {} paused", self.session_id);
        }
    }

    /// Resume accounting; the paused span is removed from every clock.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        let paused_for = (now - paused_at).max(TimeDelta::zero());

        self.stats.session_start += paused_for;
        if let Some(start) = self.stats.distraction_start.as_mut() {
            *start += paused_for;
        }
        self.stats.last_tick = now;

        log::info!(
            "session {} resumed after {:.1}s",
            self.session_id,
            seconds(paused_for)
        );
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Totals for the session as of `now`
    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let end = self.paused_at.unwrap_or(now);
        let snapshot = self.snapshot(end);
        SessionSummary {
            session_id: self.session_id.clone(),
            start_time: self.stats.session_start,
            end_time: end,
            total_time_sec: seconds(snapshot.session_time),
            attention_time_sec: seconds(snapshot.attention_time),
            attention_pct: snapshot.attention_percentage,
        }
    }
}

/// Duration as fractional seconds
pub fn seconds(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    fn accumulator() -> SessionAccumulator {
        SessionAccumulator::with_session_id("test-session".to_string(), t0())
    }

    #[test]
    fn test_half_attentive_session_is_fifty_percent() {
        let mut acc = accumulator();
        let mut last = None;

        for i in 1..=100 {
            let state = AttentionState::from_attentive(i <= 50);
            last = Some(acc.tick(at(i * 100), state));
        }

        let snapshot = last.unwrap();
        assert_eq!(snapshot.session_time, TimeDelta::seconds(10));
        assert!((snapshot.attention_percentage - 50.0).abs() <= 0.5);
    }

    #[test]
    fn test_empty_session_is_one_hundred_percent() {
        let acc = accumulator();
        let snapshot = acc.snapshot(t0());

        assert_eq!(snapshot.session_time, TimeDelta::zero());
        assert_eq!(snapshot.attention_percentage, 100.0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut acc = accumulator();
        for i in 1..=30 {
            acc.tick(at(i * 100), AttentionState::from_attentive(i % 3 == 0));
        }

        acc.reset(at(3_000));
        let snapshot = acc.snapshot(at(3_000));

        assert_eq!(snapshot.session_time, TimeDelta::zero());
        assert_eq!(snapshot.attention_time, TimeDelta::zero());
        assert_eq!(snapshot.attention_percentage, 100.0);
        assert_eq!(snapshot.distraction_duration, TimeDelta::zero());

        // Idempotent
        acc.reset(at(3_000));
        assert_eq!(acc.snapshot(at(3_000)), snapshot);
    }

    #[test]
    fn test_distraction_grows_then_drops_on_attentive_tick() {
        let mut acc = accumulator();
        let mut previous = TimeDelta::zero();

        // First distracted tick opens the streak at zero
        let first = acc.tick(at(100), AttentionState::Distracted);
        assert_eq!(first.distraction_duration, TimeDelta::zero());

        for i in 2..=20 {
            let snapshot = acc.tick(at(i * 100), AttentionState::Distracted);
            assert!(snapshot.distraction_duration > previous);
            previous = snapshot.distraction_duration;
        }

        let snapshot = acc.tick(at(2_100), AttentionState::Attentive);
        assert_eq!(snapshot.distraction_duration, TimeDelta::zero());
        assert!(acc.stats().distraction_start.is_none());
    }

    #[test]
    fn test_attention_never_decreases() {
        let mut acc = accumulator();
        let mut previous = TimeDelta::zero();

        for i in 1..=50 {
            let snapshot = acc.tick(at(i * 100), AttentionState::from_attentive(i % 7 < 4));
            assert!(snapshot.attention_time >= previous);
            previous = snapshot.attention_time;
        }
    }

    #[test]
    fn test_pause_excludes_time_while_attentive() {
        let mut acc = accumulator();
        for i in 1..=10 {
            acc.tick(at(i * 100), AttentionState::Attentive);
        }
        assert_eq!(acc.stats().attention_accumulated, TimeDelta::seconds(1));

        acc.pause(at(1_000));
        // Ticks while paused are ignored
        acc.tick(at(30_000), AttentionState::Attentive);
        acc.resume(at(61_000));

        let snapshot = acc.tick(at(61_100), AttentionState::Attentive);
        assert_eq!(snapshot.attention_time, TimeDelta::milliseconds(1_100));
        assert_eq!(snapshot.session_time, TimeDelta::milliseconds(1_100));
        assert!((snapshot.attention_percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_excludes_time_while_distracted() {
        let mut acc = accumulator();
        for i in 1..=10 {
            acc.tick(at(i * 100), AttentionState::Distracted);
        }
        let before = acc.snapshot(at(1_000)).distraction_duration;
        assert_eq!(before, TimeDelta::milliseconds(900));

        acc.pause(at(1_000));
        let frozen = acc.snapshot(at(40_000));
        assert_eq!(frozen.distraction_duration, before);

        acc.resume(at(60_000));
        let snapshot = acc.tick(at(60_100), AttentionState::Distracted);
        assert_eq!(snapshot.distraction_duration, TimeDelta::milliseconds(1_000));
        assert_eq!(snapshot.attention_time, TimeDelta::zero());
    }

    #[test]
    fn test_backwards_clock_contributes_nothing() {
        let mut acc = accumulator();
        acc.tick(at(1_000), AttentionState::Attentive);
        acc.tick(at(500), AttentionState::Attentive);

        assert_eq!(acc.stats().attention_accumulated, TimeDelta::seconds(1));
        assert_eq!(acc.stats().last_tick, at(1_000));
    }

    #[test]
    fn test_backwards_distracted_tick_starts_streak_at_last_tick() {
        let mut acc = accumulator();
        acc.tick(at(1_000), AttentionState::Attentive);
        acc.tick(at(500), AttentionState::Distracted);

        assert_eq!(acc.stats().distraction_start, Some(at(1_000)));
        let snapshot = acc.snapshot(at(1_000));
        assert_eq!(snapshot.distraction_duration, TimeDelta::zero());
        assert_eq!(acc.snapshot(at(1_500)).distraction_duration, TimeDelta::milliseconds(500));
    }

    #[test]
    fn test_summary_while_paused_ends_at_pause() {
        let mut acc = accumulator();
        acc.tick(at(2_000), AttentionState::Attentive);
        acc.pause(at(2_000));

        let summary = acc.summary(at(10_000));
        assert_eq!(summary.end_time, at(2_000));
        let span = seconds(summary.end_time - summary.start_time);
        assert!((summary.total_time_sec - span).abs() < 1e-9);
        assert!((summary.total_time_sec - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_totals() {
        let mut acc = accumulator();
        for i in 1..=40 {
            acc.tick(at(i * 100), AttentionState::from_attentive(i > 10));
        }

        let summary = acc.summary(at(4_000));
        assert_eq!(summary.session_id, "test-session");
        assert_eq!(summary.start_time, t0());
        assert_eq!(summary.end_time, at(4_000));
        assert!((summary.total_time_sec - 4.0).abs() < 1e-9);
        assert!((summary.attention_time_sec - 3.0).abs() < 1e-9);
        assert!((summary.attention_pct - 75.0).abs() < 1e-9);
    }
}
