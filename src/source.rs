//! Landmark frame sources
//!
//! The detector is an external collaborator. Anything that can hand out timed
//! landmark frames implements [`LandmarkSource`]: an NDJSON stream of
//! attn.landmark_frame.v1 records, an in-memory script for tests, or a binding
//! to a live detector.

use crate::error::ComputeError;
use crate::schema::FrameEventAdapter;
use crate::types::TimedFrame;
use std::collections::VecDeque;
use std::io::BufRead;

/// Source of landmark frames
pub trait LandmarkSource {
    /// Next frame, `None` once the source is exhausted
    fn next_frame(&mut self) -> Option<Result<TimedFrame, ComputeError>>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn next_frame(&mut self) -> Option<Result<TimedFrame, ComputeError>> {
        (**self).next_frame()
    }
}

/// Frames reconstructed from NDJSON frame records, one per line
pub struct NdjsonSource<R> {
    reader: R,
    line_num: usize,
    buffer: String,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> LandmarkSource for NdjsonSource<R> {
    fn next_frame(&mut self) -> Option<Result<TimedFrame, ComputeError>> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_num += 1;
                    let trimmed = self.buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let frame = FrameEventAdapter::parse_line(trimmed, self.line_num)
                        .and_then(|event| event.to_timed_frame());
                    return Some(frame);
                }
                Err(e) => return Some(Err(ComputeError::SourceError(e.to_string()))),
            }
        }
    }
}

/// Pre-recorded frames, handed out in order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<TimedFrame>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = TimedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: TimedFrame) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl From<Vec<TimedFrame>> for MemorySource {
    fn from(frames: Vec<TimedFrame>) -> Self {
        Self::new(frames)
    }
}

impl LandmarkSource for MemorySource {
    fn next_frame(&mut self) -> Option<Result<TimedFrame, ComputeError>> {
        self.frames.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FrameEvent;
    use crate::types::LandmarkFrame;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    #[test]
    fn test_ndjson_source_reads_frames_and_reports_bad_lines() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let good = serde_json::to_string(&FrameEvent::face(ts, LandmarkFrame::centered())).unwrap();
        let input = format!("{good}\n\nnot json\n");

        let mut source = NdjsonSource::new(Cursor::new(input));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.landmarks, Some(LandmarkFrame::centered()));

        let second = source.next_frame().unwrap();
        let err = second.unwrap_err();
        assert!(err.to_string().contains("line 3"));

        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_memory_source_preserves_order() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let mut source = MemorySource::new(vec![TimedFrame::no_face(ts)]);
        source.push(TimedFrame::face(ts, LandmarkFrame::centered()));
        assert_eq!(source.remaining(), 2);

        assert!(source.next_frame().unwrap().unwrap().landmarks.is_none());
        assert!(source.next_frame().unwrap().unwrap().landmarks.is_some());
        assert!(source.next_frame().is_none());
    }
}
