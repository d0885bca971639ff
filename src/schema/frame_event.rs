//! attn.landmark_frame.v1 record definition
//!
//! One record per detector callback. The face is described in one of two ways:
//! - `landmarks`: the named points the pipeline reads
//! - `mesh`: the detector's full face-mesh point array, resolved through the
//!   index table in [`crate::schema::mesh`]
//!
//! A record with neither (or with `face_detected: false`) means no face.

use crate::error::ComputeError;
use crate::schema::mesh::frame_from_mesh;
use crate::types::{LandmarkFrame, Point, TimedFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "attn.landmark_frame.v1";

/// Detector that produced the frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {
    /// Detector or model name (e.g., "mediapipe-face-mesh")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,
    /// Camera or device identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// A single landmark frame record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Schema version identifier
    pub schema_version: String,
    /// Optional frame identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    /// Capture timestamp (UTC)
    pub timestamp: DateTime<Utc>,
    /// Producing detector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Explicit detection flag; inferred from the presence of points when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_detected: Option<bool>,
    /// Named landmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkFrame>,
    /// Full face-mesh points (extra fields such as `z` are ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<Vec<Point>>,
}

impl FrameEvent {
    /// A record carrying named landmarks
    pub fn face(timestamp: DateTime<Utc>, landmarks: LandmarkFrame) -> Self {
        FrameEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            frame_id: None,
            timestamp,
            source: None,
            face_detected: Some(true),
            landmarks: Some(landmarks),
            mesh: None,
        }
    }

    /// A record carrying a face-mesh point array
    pub fn mesh(timestamp: DateTime<Utc>, mesh: Vec<Point>) -> Self {
        FrameEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            frame_id: None,
            timestamp,
            source: None,
            face_detected: Some(true),
            landmarks: None,
            mesh: Some(mesh),
        }
    }

    /// A record for a frame in which no face was found
    pub fn no_face(timestamp: DateTime<Utc>) -> Self {
        FrameEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            frame_id: None,
            timestamp,
            source: None,
            face_detected: Some(false),
            landmarks: None,
            mesh: None,
        }
    }

    /// Attach a frame identifier
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    /// Attach source metadata
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Whether this record reports a face
    pub fn has_face(&self) -> bool {
        self.face_detected
            .unwrap_or(self.landmarks.is_some() || self.mesh.is_some())
    }

    /// Validate the record schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.landmarks.is_some() && self.mesh.is_some() {
            return Err(ValidationError::AmbiguousFace);
        }

        if !self.has_face() {
            return Ok(());
        }

        match (&self.landmarks, &self.mesh) {
            (Some(landmarks), None) => {
                if !landmarks.is_finite() {
                    return Err(ValidationError::NonFiniteCoordinate);
                }
                Ok(())
            }
            (None, Some(mesh)) => {
                let frame = frame_from_mesh(mesh).map_err(|_| ValidationError::MeshTooShort {
                    actual: mesh.len(),
                    required: crate::schema::mesh::REQUIRED_MESH_POINTS,
                })?;
                if !frame.is_finite() {
                    return Err(ValidationError::NonFiniteCoordinate);
                }
                Ok(())
            }
            _ => Err(ValidationError::MissingPoints),
        }
    }

    /// Resolve the record into a timed frame for the pipeline
    pub fn to_timed_frame(&self) -> Result<TimedFrame, ComputeError> {
        self.validate()
            .map_err(|e| ComputeError::InvalidLandmark(e.to_string()))?;

        if !self.has_face() {
            return Ok(TimedFrame::no_face(self.timestamp));
        }

        let landmarks = match (&self.landmarks, &self.mesh) {
            (Some(landmarks), _) => *landmarks,
            (None, Some(mesh)) => frame_from_mesh(mesh)?,
            (None, None) => {
                return Err(ComputeError::MissingLandmark(
                    "face_detected is set but no points were supplied".to_string(),
                ))
            }
        };

        Ok(TimedFrame::face(self.timestamp, landmarks))
    }
}

/// Validation errors for frame records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Record carries both landmarks and mesh")]
    AmbiguousFace,

    #[error("Face reported but neither landmarks nor mesh supplied")]
    MissingPoints,

    #[error("Mesh has {actual} points, {required} required")]
    MeshTooShort { actual: usize, required: usize },

    #[error("Landmark coordinates must be finite")]
    NonFiniteCoordinate,

    #[error("Timestamp is earlier than the previous record")]
    OutOfOrder,
}
