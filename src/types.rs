//! Core types for the attention pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: landmark frames, geometry offsets, raw and stable attention signals,
//! and the per-tick statistics records handed to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single landmark position in normalized [0,1] image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The four corner landmarks bounding one eye
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeCorners {
    /// Outer-left corner as seen in the image
    pub left: Point,
    /// Outer-right corner as seen in the image
    pub right: Point,
    /// Upper lid midpoint
    pub top: Point,
    /// Lower lid midpoint
    pub bottom: Point,
}

/// Landmarks of one detected face, indexed by semantic role
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub nose_tip: Point,
    pub forehead: Point,
    pub chin: Point,
    pub left_cheek: Point,
    pub right_cheek: Point,
    pub left_eye: EyeCorners,
    pub right_eye: EyeCorners,
    pub left_iris: Point,
    pub right_iris: Point,
}

impl LandmarkFrame {
    /// All points of the frame, in a fixed order
    pub fn points(&self) -> [Point; 15] {
        [
            self.nose_tip,
            self.forehead,
            self.chin,
            self.left_cheek,
            self.right_cheek,
            self.left_eye.left,
            self.left_eye.right,
            self.left_eye.top,
            self.left_eye.bottom,
            self.right_eye.left,
            self.right_eye.right,
            self.right_eye.top,
            self.right_eye.bottom,
            self.left_iris,
            self.right_iris,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.points().iter().all(Point::is_finite)
    }

    /// Build a frontal synthetic face whose nose and irises sit at the given
    /// normalized offsets.
    ///
    /// The face spans x 0.3..0.7 and y 0.2..0.8; each eye is 0.08 wide and
    /// 0.04 tall. Both irises receive the same gaze offset. Used for scripted
    /// runs and tests where no detector is available.
    pub fn synthetic(nose_offset: (f64, f64), gaze_offset: (f64, f64)) -> Self {
        let face_center = Point::new((0.3 + 0.7) / 2.0, (0.2 + 0.8) / 2.0);

        let eye = |x0: f64, x1: f64| EyeCorners {
            left: Point::new(x0, 0.42),
            right: Point::new(x1, 0.42),
            top: Point::new((x0 + x1) / 2.0, 0.40),
            bottom: Point::new((x0 + x1) / 2.0, 0.44),
        };
        let iris = |corners: &EyeCorners| {
            let center_x = (corners.left.x + corners.right.x) / 2.0;
            let center_y = (corners.top.y + corners.bottom.y) / 2.0;
            let width = (corners.right.x - corners.left.x).abs();
            let height = (corners.bottom.y - corners.top.y).abs();
            Point::new(
                center_x + gaze_offset.0 * width,
                center_y + gaze_offset.1 * height,
            )
        };

        let left_eye = eye(0.36, 0.44);
        let right_eye = eye(0.56, 0.64);

        Self {
            nose_tip: Point::new(
                face_center.x + nose_offset.0 * 0.4,
                face_center.y + nose_offset.1 * 0.6,
            ),
            forehead: Point::new(0.5, 0.2),
            chin: Point::new(0.5, 0.8),
            left_cheek: Point::new(0.3, 0.5),
            right_cheek: Point::new(0.7, 0.5),
            left_iris: iris(&left_eye),
            right_iris: iris(&right_eye),
            left_eye,
            right_eye,
        }
    }

    /// Synthetic face looking straight at the screen
    pub fn centered() -> Self {
        Self::synthetic((0.0, 0.0), (0.0, 0.0))
    }
}

/// One detector callback: a timestamp and the face it saw, if any
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFrame {
    pub timestamp: DateTime<Utc>,
    /// `None` when the detector found no face in this frame
    pub landmarks: Option<LandmarkFrame>,
}

impl TimedFrame {
    pub fn face(timestamp: DateTime<Utc>, landmarks: LandmarkFrame) -> Self {
        Self {
            timestamp,
            landmarks: Some(landmarks),
        }
    }

    pub fn no_face(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            landmarks: None,
        }
    }
}

/// Nose displacement from the face center, normalized by face width/height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Iris displacement from each eye center, normalized by eye width/height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeGeometry {
    pub left_gaze_x: f64,
    pub left_gaze_y: f64,
    pub right_gaze_x: f64,
    pub right_gaze_y: f64,
    /// Mean of |left_gaze_x| and |right_gaze_x|
    pub avg_gaze_x: f64,
    /// Mean of |left_gaze_y| and |right_gaze_y|
    pub avg_gaze_y: f64,
}

/// Unfiltered per-frame classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawSignal {
    pub face_detected: bool,
    pub face_looking: bool,
    pub eyes_looking: bool,
    pub attentive: bool,
}

/// Everything derived from the most recent frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub face: FaceGeometry,
    pub eyes: EyeGeometry,
    pub signal: RawSignal,
}

/// Debounced attention state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionState {
    Attentive,
    #[default]
    Distracted,
}

impl AttentionState {
    pub fn from_attentive(attentive: bool) -> Self {
        if attentive {
            AttentionState::Attentive
        } else {
            AttentionState::Distracted
        }
    }

    pub fn is_attentive(&self) -> bool {
        matches!(self, AttentionState::Attentive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionState::Attentive => "attentive",
            AttentionState::Distracted => "distracted",
        }
    }
}

/// Statistics record emitted once per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Tick time
    pub timestamp: DateTime<Utc>,
    /// Monitoring session identifier
    pub session_id: String,
    pub is_attentive: bool,
    pub face_detected: bool,
    pub face_looking: bool,
    pub eyes_looking: bool,
    /// Seconds since session start, excluding paused time
    pub session_time: f64,
    /// Seconds accumulated in the attentive state
    pub attention_time: f64,
    /// attention_time / session_time as a percentage (100 for an empty session)
    pub attention_percentage: f64,
    /// Seconds of the current distraction streak
    pub distraction_duration: f64,
    pub nose_offset_x: f64,
    pub nose_offset_y: f64,
    pub avg_eye_gaze_x: f64,
    pub avg_eye_gaze_y: f64,
    /// Distraction streak has reached the alert delay
    pub alert: bool,
}

/// End-of-session totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_time_sec: f64,
    pub attention_time_sec: f64,
    pub attention_pct: f64,
}

/// Producer metadata attached to encoded output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Stats record wrapped with producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPayload {
    pub schema_version: String,
    pub producer: Producer,
    pub stats: StatsRecord,
}

/// Session summary wrapped with producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub schema_version: String,
    pub producer: Producer,
    pub summary: SessionSummary,
}

/// Format seconds as HH:MM:SS
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
