//! Attention classification
//!
//! Two stages: a per-frame threshold test producing a [`RawSignal`], then a
//! hysteresis filter that only lets the stable state change after the raw
//! signal has held its new value for a full window.

use crate::geometry::GeometryExtractor;
use crate::thresholds::Thresholds;
use crate::types::{
    AttentionState, EyeGeometry, FaceGeometry, FrameAnalysis, LandmarkFrame, RawSignal,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Default hysteresis window in milliseconds
pub const DEFAULT_HYSTERESIS_WINDOW_MS: i64 = 300;

/// Threshold test for a single frame
///
/// `face_looking` requires both nose offsets strictly inside the face threshold;
/// `eyes_looking` requires both averaged gaze magnitudes strictly inside the eye
/// threshold. Without a face nothing is looking.
pub fn classify(
    face: &FaceGeometry,
    eyes: &EyeGeometry,
    thresholds: Thresholds,
    face_detected: bool,
) -> RawSignal {
    if !face_detected {
        return RawSignal::default();
    }

    let face_looking = face.offset_x.abs() < thresholds.face && face.offset_y.abs() < thresholds.face;
    let eyes_looking = eyes.avg_gaze_x < thresholds.eye && eyes.avg_gaze_y < thresholds.eye;

    RawSignal {
        face_detected,
        face_looking,
        eyes_looking,
        attentive: face_looking && eyes_looking,
    }
}

/// Extract geometry and classify one detector observation
pub fn analyze(landmarks: Option<&LandmarkFrame>, thresholds: Thresholds) -> FrameAnalysis {
    match landmarks {
        Some(frame) => {
            let (face, eyes) = GeometryExtractor::extract(frame);
            let signal = classify(&face, &eyes, thresholds, true);
            FrameAnalysis { face, eyes, signal }
        }
        None => FrameAnalysis::default(),
    }
}

/// A candidate state waiting out the hysteresis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    pub state: AttentionState,
    pub since: DateTime<Utc>,
}

/// Hysteresis filter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HysteresisState {
    /// Confirmed state visible to consumers
    pub stable: AttentionState,
    /// Candidate state, if the raw signal currently disagrees with `stable`
    pub pending: Option<Pending>,
}

impl HysteresisState {
    /// Apply one raw observation; see [`transition`]
    pub fn step(self, raw: bool, now: DateTime<Utc>, window: TimeDelta) -> Self {
        transition(self, raw, now, window)
    }
}

/// Pure hysteresis transition
///
/// - raw agrees with `stable`: drop any pending candidate
/// - raw differs from the pending candidate (or none): start a new window at `now`
/// - raw matches the pending candidate for at least `window`: commit it
/// - otherwise: keep waiting
pub fn transition(
    state: HysteresisState,
    raw: bool,
    now: DateTime<Utc>,
    window: TimeDelta,
) -> HysteresisState {
    let observed = AttentionState::from_attentive(raw);

    if observed == state.stable {
        return HysteresisState {
            stable: state.stable,
            pending: None,
        };
    }

    match state.pending {
        Some(pending) if pending.state == observed => {
            if now - pending.since >= window {
                HysteresisState {
                    stable: observed,
                    pending: None,
                }
            } else {
                state
            }
        }
        _ => HysteresisState {
            stable: state.stable,
            pending: Some(Pending {
                state: observed,
                since: now,
            }),
        },
    }
}

/// Stateful classifier: threshold test plus hysteresis, fed one frame at a time
#[derive(Debug, Clone)]
pub struct AttentionClassifier {
    hysteresis: HysteresisState,
    window: TimeDelta,
    last: FrameAnalysis,
}

impl Default for AttentionClassifier {
    fn default() -> Self {
        Self::new(TimeDelta::milliseconds(DEFAULT_HYSTERESIS_WINDOW_MS))
    }
}

impl AttentionClassifier {
    /// Create a classifier with the given hysteresis window, starting Distracted
    pub fn new(window: TimeDelta) -> Self {
        Self {
            hysteresis: HysteresisState::default(),
            window,
            last: FrameAnalysis::default(),
        }
    }

    /// Classify one observation and advance the hysteresis filter
    ///
    /// `thresholds` is taken by value: the caller snapshots the store once per
    /// frame.
    pub fn observe(
        &mut self,
        landmarks: Option<&LandmarkFrame>,
        thresholds: Thresholds,
        now: DateTime<Utc>,
    ) -> AttentionState {
        let analysis = analyze(landmarks, thresholds);
        let before = self.hysteresis.stable;

        self.hysteresis = transition(self.hysteresis, analysis.signal.attentive, now, self.window);
        self.last = analysis;

        if self.hysteresis.stable != before {
            log::debug!(
                "stable state {} -> {} at {}",
                before.as_str(),
                self.hysteresis.stable.as_str(),
                now.to_rfc3339()
            );
        }

        self.hysteresis.stable
    }

    /// Current confirmed state
    pub fn stable(&self) -> AttentionState {
        self.hysteresis.stable
    }

    pub fn hysteresis(&self) -> HysteresisState {
        self.hysteresis
    }

    /// Analysis of the most recent frame
    pub fn last_analysis(&self) -> &FrameAnalysis {
        &self.last
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }
}
