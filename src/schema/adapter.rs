//! Adapter for converting attn.landmark_frame.v1 records into pipeline frames

use crate::error::ComputeError;
use crate::schema::frame_event::*;
use crate::types::TimedFrame;

/// Adapter for parsing and resolving frame records
pub struct FrameEventAdapter;

impl FrameEventAdapter {
    /// Parse a JSON string containing an array of FrameEvents
    pub fn parse_array(json: &str) -> Result<Vec<FrameEvent>, ComputeError> {
        let events: Vec<FrameEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing FrameEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameEvent>, ComputeError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            events.push(Self::parse_line(trimmed, line_num + 1)?);
        }
        Ok(events)
    }

    /// Parse a single NDJSON line; `line_num` is 1-based and only used in errors
    pub fn parse_line(line: &str, line_num: usize) -> Result<FrameEvent, ComputeError> {
        serde_json::from_str::<FrameEvent>(line).map_err(|e| {
            ComputeError::ParseError(format!("Failed to parse line {}: {}", line_num, e))
        })
    }

    /// Resolve records into timed frames, failing on the first invalid record
    pub fn to_frames(events: &[FrameEvent]) -> Result<Vec<TimedFrame>, ComputeError> {
        events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                event.to_timed_frame().map_err(|e| {
                    ComputeError::ParseError(format!("Invalid frame at index {}: {}", idx, e))
                })
            })
            .collect()
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_events(events: &[FrameEvent]) -> Vec<ValidationResult> {
        let mut results: Vec<ValidationResult> = events
            .iter()
            .enumerate()
            .map(|(idx, event)| ValidationResult {
                index: idx,
                frame_id: event.frame_id.clone(),
                result: event.validate().err(),
            })
            .filter(|r| r.result.is_some())
            .collect();

        // Replay needs time-ordered input
        for (idx, pair) in events.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp && pair[1].validate().is_ok() {
                results.push(ValidationResult {
                    index: idx + 1,
                    frame_id: pair[1].frame_id.clone(),
                    result: Some(ValidationError::OutOfOrder),
                });
            }
        }
        results.sort_by_key(|r| r.index);

        results
    }
}

/// Result of record validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub frame_id: Option<String>,
    pub result: Option<ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LandmarkFrame;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    fn sample_ndjson() -> String {
        [
            FrameEvent::face(at(0), LandmarkFrame::centered()),
            FrameEvent::no_face(at(33)),
            FrameEvent::face(at(66), LandmarkFrame::synthetic((0.4, 0.0), (0.0, 0.0))),
        ]
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect::<Vec<_>>()
        .join("\n")
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = format!("\n{}\n\n", sample_ndjson());
        let events = FrameEventAdapter::parse_ndjson(&input).unwrap();
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = format!("{}\n{{broken", sample_ndjson());
        let err = FrameEventAdapter::parse_ndjson(&input).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_parse_array() {
        let events = FrameEventAdapter::parse_ndjson(&sample_ndjson()).unwrap();
        let json = serde_json::to_string(&events).unwrap();

        let parsed = FrameEventAdapter::parse_array(&json).unwrap();
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_to_frames() {
        let events = FrameEventAdapter::parse_ndjson(&sample_ndjson()).unwrap();
        let frames = FrameEventAdapter::to_frames(&events).unwrap();

        assert_eq!(frames.len(), 3);
        assert!(frames[0].landmarks.is_some());
        assert!(frames[1].landmarks.is_none());
        assert_eq!(frames[2].timestamp, at(66));
    }

    #[test]
    fn test_validate_events_reports_failures_and_ordering() {
        let mut bad_version = FrameEvent::no_face(at(200)).with_frame_id("bad");
        bad_version.schema_version = "other".to_string();

        let events = vec![
            FrameEvent::no_face(at(100)),
            bad_version,
            FrameEvent::no_face(at(50)).with_frame_id("late"),
        ];

        let results = FrameEventAdapter::validate_events(&events);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].frame_id.as_deref(), Some("bad"));
        assert_eq!(results[1].index, 2);
        assert_eq!(results[1].result, Some(ValidationError::OutOfOrder));
    }
}
