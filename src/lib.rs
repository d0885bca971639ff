//! Attention Monitor - screen attention classification from facial landmarks
//!
//! Turns a stream of face-mesh landmark frames into a per-frame attention
//! judgement and accumulated session statistics through a deterministic
//! pipeline: geometry extraction → threshold classification → hysteresis →
//! session accumulation → alerting.
//!
//! ## Modules
//!
//! - **Frame pipeline**: [`geometry`], [`classifier`] and [`thresholds`] turn one
//!   landmark frame into a stable attentive/distracted state
//! - **Session pipeline**: [`session`] and [`alert`] turn the stable state into
//!   timed statistics on a fixed tick
//! - **Driving**: [`pipeline`] wires both together and replays recorded frame
//!   streams from a [`source`]

pub mod alert;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod source;
pub mod thresholds;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{transition, AttentionClassifier, HysteresisState};
pub use config::MonitorConfig;
pub use encoder::StatsEncoder;
pub use error::ComputeError;
pub use geometry::GeometryExtractor;
pub use pipeline::{frames_to_stats, AttentionMonitor, ReplayDriver, ReplayOutput};
pub use session::SessionAccumulator;
pub use source::{LandmarkSource, MemorySource, NdjsonSource};
pub use thresholds::{ThresholdKind, ThresholdStore, Thresholds};
pub use types::{AttentionState, LandmarkFrame, SessionSummary, StatsRecord, TimedFrame};

// Schema exports
pub use schema::{FrameEvent, FrameEventAdapter, SCHEMA_VERSION};

/// Monitor version embedded in all encoded payloads
pub const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded payloads
pub const PRODUCER_NAME: &str = "attention-monitor";
