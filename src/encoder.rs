//! Stats encoding
//!
//! Wraps stats records and session summaries with producer metadata for
//! downstream consumers. Records carry the monitor's own numbers unchanged;
//! the encoder only adds the envelope.

use crate::error::ComputeError;
use crate::types::{Producer, SessionSummary, StatsPayload, StatsRecord, SummaryPayload};
use crate::{MONITOR_VERSION, PRODUCER_NAME};
use uuid::Uuid;

/// Schema version of encoded stats records
pub const STATS_SCHEMA_VERSION: &str = "attn.stats.v1";

/// Schema version of encoded session summaries
pub const SUMMARY_SCHEMA_VERSION: &str = "attn.session_summary.v1";

/// Encoder for stats and summary payloads
pub struct StatsEncoder {
    instance_id: String,
}

impl Default for StatsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode_stats(&self, record: &StatsRecord) -> Result<StatsPayload, ComputeError> {
        check_finite(record)?;

        Ok(StatsPayload {
            schema_version: STATS_SCHEMA_VERSION.to_string(),
            producer: self.producer(),
            stats: record.clone(),
        })
    }

    pub fn encode_summary(&self, summary: &SessionSummary) -> Result<SummaryPayload, ComputeError> {
        Ok(SummaryPayload {
            schema_version: SUMMARY_SCHEMA_VERSION.to_string(),
            producer: self.producer(),
            summary: summary.clone(),
        })
    }

    /// Encode a stats record as a single JSON line
    pub fn encode_stats_to_json(&self, record: &StatsRecord) -> Result<String, ComputeError> {
        let payload = self.encode_stats(record)?;
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }

    /// Encode a session summary as pretty JSON
    pub fn encode_summary_to_json(&self, summary: &SessionSummary) -> Result<String, ComputeError> {
        let payload = self.encode_summary(summary)?;
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: MONITOR_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}

// serde_json writes non-finite floats as null, which consumers cannot tell
// apart from a missing field
fn check_finite(record: &StatsRecord) -> Result<(), ComputeError> {
    let fields = [
        ("session_time", record.session_time),
        ("attention_time", record.attention_time),
        ("attention_percentage", record.attention_percentage),
        ("distraction_duration", record.distraction_duration),
        ("nose_offset_x", record.nose_offset_x),
        ("nose_offset_y", record.nose_offset_y),
        ("avg_eye_gaze_x", record.avg_eye_gaze_x),
        ("avg_eye_gaze_y", record.avg_eye_gaze_y),
    ];

    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(ComputeError::EncodingError(format!(
            "{name} is not finite ({value})"
        ))),
        None => Ok(()),
    }
}
