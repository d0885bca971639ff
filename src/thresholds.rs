//! Threshold store
//!
//! Face and eye thresholds are adjustable at any time, possibly from another
//! thread (a UI slider, a key handler). The store is a cheap cloneable handle;
//! the classifier takes one snapshot per frame so the x- and y-axis comparisons
//! of a frame always see the same pair of values.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Default face threshold: how far the nose may be off-center
pub const DEFAULT_FACE_THRESHOLD: f64 = 0.31;

/// Default eye threshold: how far the iris may be from the eye center
pub const DEFAULT_EYE_THRESHOLD: f64 = 0.22;

/// Lower bound used when nudging thresholds
pub const NUDGE_MIN: f64 = 0.1;

/// Upper bound used when nudging thresholds
pub const NUDGE_MAX: f64 = 0.5;

/// Step applied per nudge
pub const NUDGE_STEP: f64 = 0.01;

/// Normalized maximum offsets below which "looking at screen" holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub face: f64,
    pub eye: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            face: DEFAULT_FACE_THRESHOLD,
            eye: DEFAULT_EYE_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Create thresholds, rejecting values outside the open interval (0, 1)
    pub fn new(face: f64, eye: f64) -> Result<Self, ComputeError> {
        let thresholds = Self { face, eye };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        check_unit_open("face", self.face)?;
        check_unit_open("eye", self.eye)
    }
}

fn check_unit_open(name: &str, value: f64) -> Result<(), ComputeError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidThreshold(format!(
            "{name} threshold must be in (0, 1), got {value}"
        )))
    }
}

/// Which threshold a nudge applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Face,
    Eye,
}

/// Shared, externally adjustable thresholds
#[derive(Debug, Clone, Default)]
pub struct ThresholdStore {
    inner: Arc<RwLock<Thresholds>>,
}

impl ThresholdStore {
    pub fn new(thresholds: Thresholds) -> Result<Self, ComputeError> {
        thresholds.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(thresholds)),
        })
    }

    /// Snapshot of the current thresholds
    pub fn get(&self) -> Thresholds {
        // A poisoned lock still holds a valid Copy value; writers never leave
        // it half-updated.
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace both thresholds; takes effect on the next classified frame
    pub fn set(&self, thresholds: Thresholds) -> Result<(), ComputeError> {
        thresholds.validate()?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = thresholds;
        log::debug!(
            "thresholds set: face={:.2} eye={:.2}",
            thresholds.face,
            thresholds.eye
        );
        Ok(())
    }

    /// Move one threshold by `steps` increments of 0.01, clamped to [0.1, 0.5].
    ///
    /// Positive steps make classification more lenient. Returns the new value.
    pub fn nudge(&self, kind: ThresholdKind, steps: i32) -> f64 {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let slot = match kind {
            ThresholdKind::Face => &mut guard.face,
            ThresholdKind::Eye => &mut guard.eye,
        };
        let raw = *slot + f64::from(steps) * NUDGE_STEP;
        // Round to the step grid so repeated nudges do not drift
        let value = ((raw / NUDGE_STEP).round() * NUDGE_STEP).clamp(NUDGE_MIN, NUDGE_MAX);
        *slot = value;
        log::debug!("{kind:?} threshold nudged to {value:.2}");
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_detector_configuration() {
        let t = Thresholds::default();
        assert_eq!(t.face, 0.31);
        assert_eq!(t.eye, 0.22);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Thresholds::new(0.0, 0.2).is_err());
        assert!(Thresholds::new(0.3, 1.0).is_err());
        assert!(Thresholds::new(-0.1, 0.2).is_err());
        assert!(Thresholds::new(f64::NAN, 0.2).is_err());
        assert!(Thresholds::new(0.3, 0.2).is_ok());
    }

    #[test]
    fn test_set_is_visible_through_clones() {
        let store = ThresholdStore::default();
        let ui_handle = store.clone();

        ui_handle.set(Thresholds::new(0.4, 0.3).unwrap()).unwrap();
        assert_eq!(store.get(), Thresholds { face: 0.4, eye: 0.3 });
    }

    #[test]
    fn test_invalid_set_keeps_previous_value() {
        let store = ThresholdStore::default();
        let bad = Thresholds { face: 1.5, eye: 0.2 };

        assert!(matches!(store.set(bad), Err(ComputeError::InvalidThreshold(_))));
        assert_eq!(store.get(), Thresholds::default());
    }

    #[test]
    fn test_nudge_steps_and_clamps() {
        let store = ThresholdStore::default();

        let face = store.nudge(ThresholdKind::Face, 2);
        assert!((face - 0.33).abs() < 1e-9);

        let eye = store.nudge(ThresholdKind::Eye, -50);
        assert!((eye - NUDGE_MIN).abs() < 1e-9);

        let face = store.nudge(ThresholdKind::Face, 100);
        assert!((face - NUDGE_MAX).abs() < 1e-9);
        assert!((store.get().face - NUDGE_MAX).abs() < 1e-9);
    }

    #[test]
    fn test_store_shared_across_threads() {
        let store = ThresholdStore::default();
        let writer = store.clone();

        std::thread::spawn(move || {
            writer.set(Thresholds { face: 0.45, eye: 0.15 }).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(store.get().face, 0.45);
    }
}
