//! Face-mesh landmark index table
//!
//! Indices into the 478-point face mesh (468 face points plus refined iris
//! points) for the landmarks the geometry extractor reads.

use crate::error::ComputeError;
use crate::types::{EyeCorners, LandmarkFrame, Point};

pub const NOSE_TIP: usize = 4;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
pub const LEFT_CHEEK: usize = 234;
pub const RIGHT_CHEEK: usize = 454;

/// Iris centers (only present with refined landmarks)
pub const LEFT_IRIS_CENTER: usize = 468;
pub const RIGHT_IRIS_CENTER: usize = 473;

pub const LEFT_EYE_LEFT: usize = 33;
pub const LEFT_EYE_RIGHT: usize = 133;
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;

pub const RIGHT_EYE_LEFT: usize = 362;
pub const RIGHT_EYE_RIGHT: usize = 263;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;

/// Smallest mesh that contains every index above
pub const REQUIRED_MESH_POINTS: usize = RIGHT_IRIS_CENTER + 1;

/// Pick the semantic landmarks out of a face-mesh point array
pub fn frame_from_mesh(mesh: &[Point]) -> Result<LandmarkFrame, ComputeError> {
    let at = |index: usize| {
        mesh.get(index).copied().ok_or_else(|| {
            ComputeError::MissingLandmark(format!(
                "mesh index {index} not present ({} points supplied, {REQUIRED_MESH_POINTS} required)",
                mesh.len()
            ))
        })
    };

    Ok(LandmarkFrame {
        nose_tip: at(NOSE_TIP)?,
        forehead: at(FOREHEAD)?,
        chin: at(CHIN)?,
        left_cheek: at(LEFT_CHEEK)?,
        right_cheek: at(RIGHT_CHEEK)?,
        left_eye: EyeCorners {
            left: at(LEFT_EYE_LEFT)?,
            right: at(LEFT_EYE_RIGHT)?,
            top: at(LEFT_EYE_TOP)?,
            bottom: at(LEFT_EYE_BOTTOM)?,
        },
        right_eye: EyeCorners {
            left: at(RIGHT_EYE_LEFT)?,
            right: at(RIGHT_EYE_RIGHT)?,
            top: at(RIGHT_EYE_TOP)?,
            bottom: at(RIGHT_EYE_BOTTOM)?,
        },
        left_iris: at(LEFT_IRIS_CENTER)?,
        right_iris: at(RIGHT_IRIS_CENTER)?,
    })
}

/// Scatter a landmark frame into a mesh-sized array; unused slots stay at the origin
pub fn mesh_from_frame(frame: &LandmarkFrame) -> Vec<Point> {
    let mut mesh = vec![Point::default(); REQUIRED_MESH_POINTS];

    mesh[NOSE_TIP] = frame.nose_tip;
    mesh[FOREHEAD] = frame.forehead;
    mesh[CHIN] = frame.chin;
    mesh[LEFT_CHEEK] = frame.left_cheek;
    mesh[RIGHT_CHEEK] = frame.right_cheek;
    mesh[LEFT_EYE_LEFT] = frame.left_eye.left;
    mesh[LEFT_EYE_RIGHT] = frame.left_eye.right;
    mesh[LEFT_EYE_TOP] = frame.left_eye.top;
    mesh[LEFT_EYE_BOTTOM] = frame.left_eye.bottom;
    mesh[RIGHT_EYE_LEFT] = frame.right_eye.left;
    mesh[RIGHT_EYE_RIGHT] = frame.right_eye.right;
    mesh[RIGHT_EYE_TOP] = frame.right_eye.top;
    mesh[RIGHT_EYE_BOTTOM] = frame.right_eye.bottom;
    mesh[LEFT_IRIS_CENTER] = frame.left_iris;
    mesh[RIGHT_IRIS_CENTER] = frame.right_iris;

    mesh
}
