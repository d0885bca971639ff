//! Attention pipeline orchestration
//!
//! [`AttentionMonitor`] owns one monitoring session: threshold store,
//! classifier and session accumulator. Frames and ticks arrive on two
//! independent cadences; the tick always reads the latest stable state.
//!
//! [`ReplayDriver`] merges a time-ordered frame stream with a fixed-rate tick
//! clock, which is how recorded sessions and the CLI drive the monitor.

use crate::alert::should_alert;
use crate::classifier::AttentionClassifier;
use crate::config::MonitorConfig;
use crate::error::ComputeError;
use crate::schema::FrameEventAdapter;
use crate::session::{seconds, SessionAccumulator};
use crate::source::{LandmarkSource, MemorySource};
use crate::thresholds::{ThresholdKind, ThresholdStore, Thresholds};
use crate::types::{AttentionState, SessionSummary, StatsRecord, TimedFrame};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Replay recorded NDJSON frame records into stats records (stateless, one-shot).
///
/// # Arguments
/// * `ndjson` - attn.landmark_frame.v1 records, one per line, time-ordered
/// * `config` - monitor configuration
///
/// # Returns
/// Emitted stats records and the session summary (absent for empty input)
pub fn frames_to_stats(ndjson: &str, config: MonitorConfig) -> Result<ReplayOutput, ComputeError> {
    let events = FrameEventAdapter::parse_ndjson(ndjson)?;
    let frames = FrameEventAdapter::to_frames(&events)?;

    let mut driver = ReplayDriver::new(config)?;
    driver.run(&mut MemorySource::new(frames))
}

/// One monitoring session
#[derive(Debug)]
pub struct AttentionMonitor {
    config: MonitorConfig,
    thresholds: ThresholdStore,
    classifier: AttentionClassifier,
    session: SessionAccumulator,
    last_frame_at: Option<DateTime<Utc>>,
}

impl AttentionMonitor {
    /// Start a session at `now` with a fresh session id
    pub fn new(config: MonitorConfig, now: DateTime<Utc>) -> Result<Self, ComputeError> {
        Self::with_session_id(config, Uuid::new_v4().to_string(), now)
    }

    pub fn with_session_id(
        config: MonitorConfig,
        session_id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, ComputeError> {
        config.validate()?;
        let thresholds = ThresholdStore::new(config.thresholds)?;
        Self::with_threshold_store(config, thresholds, session_id, now)
    }

    /// Start a session reading thresholds from an existing shared store.
    ///
    /// The store's current values take precedence over `config.thresholds`.
    pub fn with_threshold_store(
        config: MonitorConfig,
        thresholds: ThresholdStore,
        session_id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, ComputeError> {
        config.validate()?;
        log::info!("session {} started at {}", session_id, now.to_rfc3339());

        Ok(Self {
            classifier: AttentionClassifier::new(config.hysteresis_window()),
            session: SessionAccumulator::with_session_id(session_id, now),
            thresholds,
            config,
            last_frame_at: None,
        })
    }

    /// Classify one detector frame.
    ///
    /// Frames are ignored while paused, and frames older than the previous one
    /// are dropped so the hysteresis clock never runs backwards.
    pub fn process_frame(&mut self, frame: &TimedFrame) -> AttentionState {
        if self.session.is_paused() {
            return self.classifier.stable();
        }

        if let Some(last) = self.last_frame_at {
            if frame.timestamp < last {
                log::warn!(
                    "dropping out-of-order frame at {} (previous {})",
                    frame.timestamp.to_rfc3339(),
                    last.to_rfc3339()
                );
                return self.classifier.stable();
            }
        }
        self.last_frame_at = Some(frame.timestamp);

        // One snapshot per frame: both axes compare against the same values
        let thresholds = self.thresholds.get();
        self.classifier
            .observe(frame.landmarks.as_ref(), thresholds, frame.timestamp)
    }

    /// Advance the session clock and produce the stats record for `now`
    pub fn tick(&mut self, now: DateTime<Utc>) -> StatsRecord {
        self.session.tick(now, self.classifier.stable());
        self.stats(now)
    }

    /// Stats record for `now` without advancing the session clock
    pub fn stats(&self, now: DateTime<Utc>) -> StatsRecord {
        let snapshot = self.session.snapshot(now);
        let analysis = self.classifier.last_analysis();

        StatsRecord {
            timestamp: snapshot.timestamp,
            session_id: self.session.session_id().to_string(),
            is_attentive: self.classifier.stable().is_attentive(),
            face_detected: analysis.signal.face_detected,
            face_looking: analysis.signal.face_looking,
            eyes_looking: analysis.signal.eyes_looking,
            session_time: seconds(snapshot.session_time),
            attention_time: seconds(snapshot.attention_time),
            attention_percentage: snapshot.attention_percentage,
            distraction_duration: seconds(snapshot.distraction_duration),
            nose_offset_x: analysis.face.offset_x,
            nose_offset_y: analysis.face.offset_y,
            avg_eye_gaze_x: analysis.eyes.avg_gaze_x,
            avg_eye_gaze_y: analysis.eyes.avg_gaze_y,
            alert: should_alert(snapshot.distraction_duration, self.config.alert_delay()),
        }
    }

    /// Stop both cadences
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.session.pause(now);
    }

    /// Restart both cadences; paused time is not accounted
    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.session.resume(now);
    }

    /// Zero the session statistics; thresholds are kept
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.session.reset(now);
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    /// Replace thresholds; applies from the next frame
    pub fn set_thresholds(&self, thresholds: Thresholds) -> Result<(), ComputeError> {
        self.thresholds.set(thresholds)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.get()
    }

    /// Step one threshold by 0.01 increments within [0.1, 0.5]
    pub fn nudge_threshold(&self, kind: ThresholdKind, steps: i32) -> f64 {
        self.thresholds.nudge(kind, steps)
    }

    /// Shared handle for adjusting thresholds from elsewhere
    pub fn threshold_store(&self) -> ThresholdStore {
        self.thresholds.clone()
    }

    pub fn stable_state(&self) -> AttentionState {
        self.classifier.stable()
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Session totals as of `now`
    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        self.session.summary(now)
    }
}

/// Output of a complete replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayOutput {
    pub records: Vec<StatsRecord>,
    /// `None` when the source yielded no frames
    pub summary: Option<SessionSummary>,
}

/// Drives a monitor from a frame stream with a fixed-rate tick clock.
///
/// The session starts at the first frame. Before each frame is classified,
/// every tick due at or before its timestamp fires, so ticks observe the
/// stable state left by the frames strictly before them.
pub struct ReplayDriver {
    config: MonitorConfig,
    session_id: Option<String>,
    thresholds: Option<ThresholdStore>,
    monitor: Option<AttentionMonitor>,
    next_tick: Option<DateTime<Utc>>,
    last_emit: Option<DateTime<Utc>>,
    last_frame: Option<DateTime<Utc>>,
}

impl ReplayDriver {
    pub fn new(config: MonitorConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            session_id: None,
            thresholds: None,
            monitor: None,
            next_tick: None,
            last_emit: None,
            last_frame: None,
        })
    }

    /// Use a fixed session id instead of a random one
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Read thresholds from a shared store
    pub fn with_threshold_store(mut self, thresholds: ThresholdStore) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Feed one frame; returns the stats records emitted by ticks that fell due
    pub fn push_frame(&mut self, frame: TimedFrame) -> Result<Vec<StatsRecord>, ComputeError> {
        let now = frame.timestamp;
        let mut emitted = Vec::new();

        if self.monitor.is_none() {
            self.start(now)?;
        }

        if let Some(last) = self.last_frame {
            if now < last {
                log::warn!("skipping out-of-order frame at {}", now.to_rfc3339());
                return Ok(emitted);
            }
        }
        self.last_frame = Some(now);

        let interval = self.config.tick_interval();
        while let Some(tick_at) = self.next_tick.filter(|t| *t <= now) {
            if let Some(record) = self.tick(tick_at) {
                emitted.push(record);
            }
            self.next_tick = Some(advance(tick_at, interval)?);
        }

        if let Some(monitor) = self.monitor.as_mut() {
            monitor.process_frame(&frame);
        }

        Ok(emitted)
    }

    /// Close the stream: tick once more at the last frame if needed and
    /// return the final record and session summary
    pub fn finish(&mut self) -> (Vec<StatsRecord>, Option<SessionSummary>) {
        let Some(end) = self.last_frame else {
            return (Vec::new(), None);
        };
        let Some(monitor) = self.monitor.as_mut() else {
            return (Vec::new(), None);
        };

        let interval = self.config.tick_interval();
        let ticked_up_to = self.next_tick.and_then(|t| t.checked_sub_signed(interval));
        let record = if ticked_up_to.map_or(true, |t| t < end) {
            monitor.tick(end)
        } else {
            monitor.stats(end)
        };

        let summary = monitor.summary(end);
        log::info!(
            "session {} finished: {:.1}s total, {:.1}% attentive",
            summary.session_id,
            summary.total_time_sec,
            summary.attention_pct
        );

        let records = if self.last_emit == Some(record.timestamp) {
            Vec::new()
        } else {
            self.last_emit = Some(record.timestamp);
            vec![record]
        };

        (records, Some(summary))
    }

    /// Drain a source to completion
    pub fn run(&mut self, source: &mut dyn LandmarkSource) -> Result<ReplayOutput, ComputeError> {
        let mut records = Vec::new();

        while let Some(frame) = source.next_frame() {
            records.extend(self.push_frame(frame?)?);
        }

        let (tail, summary) = self.finish();
        records.extend(tail);

        Ok(ReplayOutput { records, summary })
    }

    /// Pause the underlying monitor (no-op before the first frame)
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.pause(now);
        }
    }

    /// Resume the underlying monitor; ticks that fell due while paused are skipped
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), ComputeError> {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.resume(now);
            self.next_tick = Some(advance(now, self.config.tick_interval())?);
        }
        Ok(())
    }

    pub fn monitor(&self) -> Option<&AttentionMonitor> {
        self.monitor.as_ref()
    }

    pub fn monitor_mut(&mut self) -> Option<&mut AttentionMonitor> {
        self.monitor.as_mut()
    }

    fn start(&mut self, now: DateTime<Utc>) -> Result<(), ComputeError> {
        let session_id = self
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let monitor = match self.thresholds.clone() {
            Some(store) => {
                AttentionMonitor::with_threshold_store(self.config.clone(), store, session_id, now)?
            }
            None => AttentionMonitor::with_session_id(self.config.clone(), session_id, now)?,
        };

        self.next_tick = Some(advance(now, self.config.tick_interval())?);
        self.monitor = Some(monitor);
        Ok(())
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Option<StatsRecord> {
        let monitor = self.monitor.as_mut()?;
        if monitor.is_paused() {
            return None;
        }
        let record = monitor.tick(now);

        let due = match self.last_emit {
            None => true,
            Some(last) => now - last >= self.config.emit_interval(),
        };
        if due {
            self.last_emit = Some(now);
            Some(record)
        } else {
            None
        }
    }
}

/// Next tick instant, failing instead of overflowing the calendar
fn advance(at: DateTime<Utc>, interval: TimeDelta) -> Result<DateTime<Utc>, ComputeError> {
    at.checked_add_signed(interval).ok_or_else(|| {
        ComputeError::InvalidConfig(format!(
            "tick after {} is outside the representable time range",
            at.to_rfc3339()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LandmarkFrame;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    fn every_tick() -> MonitorConfig {
        MonitorConfig {
            emit_interval_ms: 0,
            ..MonitorConfig::default()
        }
    }

    fn looking() -> TimedFrame {
        TimedFrame::face(t0(), LandmarkFrame::centered())
    }

    fn frame_at(ms: i64, attentive: bool) -> TimedFrame {
        if attentive {
            TimedFrame::face(at(ms), LandmarkFrame::centered())
        } else {
            TimedFrame::face(at(ms), LandmarkFrame::synthetic((0.45, 0.0), (0.0, 0.0)))
        }
    }

    #[test]
    fn test_monitor_starts_distracted_and_confirms_after_window() {
        let mut monitor =
            AttentionMonitor::with_session_id(every_tick(), "s".to_string(), t0()).unwrap();

        for ms in (0..300).step_by(33) {
            monitor.process_frame(&TimedFrame { timestamp: at(ms), ..looking() });
            assert_eq!(monitor.stable_state(), AttentionState::Distracted);
        }
        monitor.process_frame(&TimedFrame { timestamp: at(330), ..looking() });
        assert_eq!(monitor.stable_state(), AttentionState::Attentive);

        let record = monitor.tick(at(400));
        assert!(record.is_attentive);
        assert!(record.face_detected && record.face_looking && record.eyes_looking);
        assert_eq!(record.session_id, "s");
    }

    #[test]
    fn test_threshold_change_applies_on_next_frame() {
        let mut monitor = AttentionMonitor::new(every_tick(), t0()).unwrap();
        let frame = TimedFrame::face(at(0), LandmarkFrame::synthetic((0.35, 0.0), (0.0, 0.0)));

        monitor.process_frame(&frame);
        monitor.tick(at(0));
        assert!(!monitor.stats(at(0)).face_looking);

        monitor
            .set_thresholds(Thresholds { face: 0.4, eye: 0.22 })
            .unwrap();
        monitor.process_frame(&TimedFrame { timestamp: at(33), ..frame });
        assert!(monitor.stats(at(33)).face_looking);
    }

    #[test]
    fn test_reset_preserves_thresholds() {
        let mut monitor = AttentionMonitor::new(every_tick(), t0()).unwrap();
        monitor.nudge_threshold(ThresholdKind::Eye, 3);
        monitor.tick(at(2_000));

        monitor.reset(at(2_000));
        let record = monitor.stats(at(2_000));

        assert_eq!(record.session_time, 0.0);
        assert_eq!(record.attention_time, 0.0);
        assert_eq!(record.attention_percentage, 100.0);
        assert_eq!(record.distraction_duration, 0.0);
        assert!((monitor.thresholds().eye - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_frames_ignored_while_paused() {
        let mut monitor = AttentionMonitor::new(every_tick(), t0()).unwrap();
        monitor.pause(at(0));

        for ms in (0..1_000).step_by(50) {
            monitor.process_frame(&TimedFrame { timestamp: at(ms), ..looking() });
        }
        assert_eq!(monitor.stable_state(), AttentionState::Distracted);
        assert!(monitor.is_paused());
    }

    #[test]
    fn test_alert_raised_after_five_seconds_distracted() {
        let mut monitor = AttentionMonitor::new(every_tick(), t0()).unwrap();
        monitor.process_frame(&TimedFrame::no_face(at(0)));

        let mut first_alert = None;
        for i in 1..=80 {
            let record = monitor.tick(at(i * 100));
            if record.alert && first_alert.is_none() {
                first_alert = Some(i * 100);
            }
        }

        // Streak opens on the first tick (100ms) and reaches 5s at 5100ms
        assert_eq!(first_alert, Some(5_100));
    }

    #[test]
    fn test_replay_half_attentive_session() {
        let mut driver = ReplayDriver::new(every_tick())
            .unwrap()
            .with_session_id("replay");

        // 30fps for 10s: attentive for the first 5s, then looking away
        let frames: Vec<TimedFrame> = (0..=300)
            .map(|i| {
                let ms = i * 100 / 3;
                frame_at(ms, ms < 5_000)
            })
            .collect();

        let output = driver.run(&mut MemorySource::new(frames)).unwrap();
        let last = output.records.last().unwrap();
        let summary = output.summary.unwrap();

        assert!((last.session_time - 10.0).abs() < 1e-9);
        // Hysteresis shifts both edges by one window, so the split stays even
        assert!((last.attention_percentage - 50.0).abs() <= 0.5);
        assert!(!last.is_attentive);
        assert_eq!(summary.session_id, "replay");
        assert!((summary.total_time_sec - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_replay_ticks_at_fixed_cadence() {
        let mut driver = ReplayDriver::new(every_tick()).unwrap();
        // Sparse frames: one every 450ms
        let frames: Vec<TimedFrame> = (0..5).map(|i| frame_at(i * 450, true)).collect();

        let output = driver.run(&mut MemorySource::new(frames)).unwrap();
        let times: Vec<i64> = output
            .records
            .iter()
            .map(|r| (r.timestamp - t0()).num_milliseconds())
            .collect();

        assert_eq!(
            times,
            vec![100, 200, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500, 1600, 1700, 1800]
        );
    }

    #[test]
    fn test_replay_emit_interval_throttles_records() {
        let mut driver = ReplayDriver::new(MonitorConfig::default()).unwrap();
        let frames: Vec<TimedFrame> = (0..=100).map(|i| frame_at(i * 50, true)).collect();

        let output = driver.run(&mut MemorySource::new(frames)).unwrap();
        let times: Vec<i64> = output
            .records
            .iter()
            .map(|r| (r.timestamp - t0()).num_milliseconds())
            .collect();

        assert_eq!(times, vec![100, 1100, 2100, 3100, 4100, 5000]);
    }

    #[test]
    fn test_replay_drops_out_of_order_frames() {
        let mut driver = ReplayDriver::new(every_tick()).unwrap();
        driver.push_frame(frame_at(500, true)).unwrap();

        let emitted = driver.push_frame(frame_at(200, true)).unwrap();
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_replay_pause_skips_ticks() {
        let mut driver = ReplayDriver::new(every_tick()).unwrap();
        for i in 0..=10 {
            driver.push_frame(frame_at(i * 100, true)).unwrap();
        }

        driver.pause(at(1_000));
        let during_pause = driver.push_frame(frame_at(20_000, true)).unwrap();
        assert!(during_pause.is_empty());

        driver.resume(at(20_000)).unwrap();
        let emitted = driver.push_frame(frame_at(20_100, true)).unwrap();
        assert_eq!(emitted.len(), 1);
        assert!((emitted[0].session_time - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_replay_near_end_of_time_errors_instead_of_panicking() {
        let mut driver = ReplayDriver::new(every_tick()).unwrap();
        let last_instant = DateTime::<Utc>::MAX_UTC;

        let result = driver.push_frame(TimedFrame::face(last_instant, LandmarkFrame::centered()));
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
        assert!(driver.monitor().is_none());
    }

    #[test]
    fn test_replay_rejects_oversized_tick_interval() {
        let config = MonitorConfig {
            tick_interval_ms: i64::MAX,
            ..MonitorConfig::default()
        };
        assert!(ReplayDriver::new(config.clone()).is_err());
        assert!(frames_to_stats("", config).is_err());
    }

    #[test]
    fn test_frames_to_stats_empty_input() {
        let output = frames_to_stats("", MonitorConfig::default()).unwrap();
        assert!(output.records.is_empty());
        assert!(output.summary.is_none());
    }

    #[test]
    fn test_frames_to_stats_invalid_input() {
        assert!(frames_to_stats("not json", MonitorConfig::default()).is_err());
    }
}
