//! Geometry extraction
//!
//! Converts one landmark frame into face-direction and eye-gaze offsets. All
//! offsets are normalized by the size of the feature they are measured in, so
//! they are independent of how far the face is from the camera.

use crate::types::{EyeCorners, EyeGeometry, FaceGeometry, LandmarkFrame, Point};

/// Extractor for face and eye geometry
pub struct GeometryExtractor;

impl GeometryExtractor {
    /// Extract both face and eye geometry from a frame
    pub fn extract(frame: &LandmarkFrame) -> (FaceGeometry, EyeGeometry) {
        (Self::face(frame), Self::eyes(frame))
    }

    /// Nose offset from the face center
    ///
    /// Face center is the midpoint of the cheeks on x and of forehead/chin on y.
    /// Formula: `(nose - center) / (face_width, face_height)`
    pub fn face(frame: &LandmarkFrame) -> FaceGeometry {
        let center_x = midpoint(frame.left_cheek.x, frame.right_cheek.x);
        let center_y = midpoint(frame.forehead.y, frame.chin.y);
        let width = (frame.right_cheek.x - frame.left_cheek.x).abs();
        let height = (frame.chin.y - frame.forehead.y).abs();

        let (offset_x, offset_y) =
            normalized_offset(frame.nose_tip, center_x, center_y, width, height);

        FaceGeometry { offset_x, offset_y }
    }

    /// Iris offsets within each eye plus their absolute-value averages
    pub fn eyes(frame: &LandmarkFrame) -> EyeGeometry {
        let (left_gaze_x, left_gaze_y) = eye_gaze(&frame.left_eye, frame.left_iris);
        let (right_gaze_x, right_gaze_y) = eye_gaze(&frame.right_eye, frame.right_iris);

        // Magnitudes are averaged, not signed values: eyes turned in opposite
        // directions must not cancel out.
        EyeGeometry {
            left_gaze_x,
            left_gaze_y,
            right_gaze_x,
            right_gaze_y,
            avg_gaze_x: midpoint(left_gaze_x.abs(), right_gaze_x.abs()),
            avg_gaze_y: midpoint(left_gaze_y.abs(), right_gaze_y.abs()),
        }
    }
}

/// Iris offset from the eye center normalized by eye width/height
fn eye_gaze(corners: &EyeCorners, iris: Point) -> (f64, f64) {
    let center_x = midpoint(corners.left.x, corners.right.x);
    let center_y = midpoint(corners.top.y, corners.bottom.y);
    let width = (corners.right.x - corners.left.x).abs();
    let height = (corners.bottom.y - corners.top.y).abs();

    normalized_offset(iris, center_x, center_y, width, height)
}

/// Component-wise `(p - center) / (width, height)`.
///
/// A zero width or height is a degenerate detection; both components are then
/// reported as zero instead of dividing.
fn normalized_offset(p: Point, center_x: f64, center_y: f64, width: f64, height: f64) -> (f64, f64) {
    if width > 0.0 && height > 0.0 {
        ((p.x - center_x) / width, (p.y - center_y) / height)
    } else {
        (0.0, 0.0)
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_centered_frame_has_zero_offsets() {
        let (face, eyes) = GeometryExtractor::extract(&LandmarkFrame::centered());

        assert_eq!(face.offset_x, 0.0);
        assert_eq!(face.offset_y, 0.0);
        assert_eq!(eyes.avg_gaze_x, 0.0);
        assert_eq!(eyes.avg_gaze_y, 0.0);
    }

    #[test]
    fn test_nose_offset_is_normalized_by_face_size() {
        let frame = LandmarkFrame::synthetic((0.4, -0.1), (0.0, 0.0));
        let face = GeometryExtractor::face(&frame);

        assert!((face.offset_x - 0.4).abs() < EPS);
        assert!((face.offset_y + 0.1).abs() < EPS);
    }

    #[test]
    fn test_zero_face_width_degrades_to_zero_offsets() {
        let mut frame = LandmarkFrame::synthetic((0.3, 0.3), (0.0, 0.0));
        frame.right_cheek.x = frame.left_cheek.x;

        let face = GeometryExtractor::face(&frame);
        assert_eq!(face, FaceGeometry::default());
    }

    #[test]
    fn test_zero_face_height_degrades_to_zero_offsets() {
        let mut frame = LandmarkFrame::synthetic((0.3, 0.3), (0.0, 0.0));
        frame.chin.y = frame.forehead.y;

        let face = GeometryExtractor::face(&frame);
        assert_eq!(face, FaceGeometry::default());
    }

    #[test]
    fn test_closed_eye_degrades_to_zero_gaze() {
        let mut frame = LandmarkFrame::synthetic((0.0, 0.0), (0.3, 0.3));
        frame.left_eye.bottom.y = frame.left_eye.top.y;

        let eyes = GeometryExtractor::eyes(&frame);
        assert_eq!(eyes.left_gaze_x, 0.0);
        assert_eq!(eyes.left_gaze_y, 0.0);
        assert!((eyes.right_gaze_x - 0.3).abs() < EPS);
        // Average still includes the degenerate eye as zero
        assert!((eyes.avg_gaze_x - 0.15).abs() < EPS);
    }

    #[test]
    fn test_opposite_gaze_does_not_cancel() {
        let mut frame = LandmarkFrame::centered();
        // Left iris pushed right by 0.2 of eye width, right iris pushed left
        frame.left_iris.x += 0.2 * 0.08;
        frame.right_iris.x -= 0.2 * 0.08;

        let eyes = GeometryExtractor::eyes(&frame);
        assert!((eyes.left_gaze_x - 0.2).abs() < EPS);
        assert!((eyes.right_gaze_x + 0.2).abs() < EPS);
        assert!((eyes.avg_gaze_x - 0.2).abs() < EPS);
    }

    #[test]
    fn test_mirrored_corners_use_absolute_size() {
        let mut frame = LandmarkFrame::synthetic((0.25, 0.0), (0.0, 0.0));
        std::mem::swap(&mut frame.left_cheek, &mut frame.right_cheek);

        let face = GeometryExtractor::face(&frame);
        assert!((face.offset_x - 0.25).abs() < EPS);
    }
}
