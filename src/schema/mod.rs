//! attn.landmark_frame.v1 input schema
//!
//! This module defines the detector-agnostic input record for landmark frames
//! and the adapter that turns those records into frames the pipeline consumes.
//! A record carries either named landmarks or a full face-mesh point array.

mod adapter;
mod frame_event;
pub mod mesh;

pub use adapter::*;
pub use frame_event::*;
