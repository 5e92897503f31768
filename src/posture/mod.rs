//! Per-frame geometry: keypoints to body position, furniture containment, and
//! the furniture-aware composite posture. Nothing here keeps state between
//! frames; that lives in [`crate::alert`].

pub mod furniture;
pub mod geometry;
pub mod resolver;

pub use furniture::{BoundingBox, DEFAULT_MIN_CONFIDENCE, FurnitureBox, FurnitureLabel, RawDetection};
pub use geometry::{BodyPosition, Keypoint, KeypointSet};
pub use resolver::CompositePosture;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostureError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Runs the three stateless stages for one detected person.
pub fn assess(
    keypoints: &KeypointSet,
    frame_height: f32,
    boxes: &[FurnitureBox],
    min_confidence: f32,
) -> Result<CompositePosture, PostureError> {
    let position = geometry::classify(keypoints, frame_height)?;
    let furniture = keypoints
        .centroid()
        .and_then(|center| furniture::locate(boxes, center, min_confidence));
    Ok(resolver::resolve(position, furniture))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lying_person() -> KeypointSet {
        // ratio (330 - 300) / 600 = 0.05, centroid (200, 315)
        KeypointSet::new(vec![Keypoint::new(150.0, 300.0), Keypoint::new(250.0, 330.0)])
    }

    #[test]
    fn lying_on_a_bed_is_sleeping() {
        let bed = FurnitureBox {
            label: FurnitureLabel::Bed,
            bounds: BoundingBox::new(100.0, 250.0, 400.0, 400.0),
            confidence: 0.9,
        };
        assert_eq!(
            assess(&lying_person(), 600.0, &[bed], 0.3),
            Ok(CompositePosture::Sleeping(FurnitureLabel::Bed))
        );
    }

    #[test]
    fn lying_on_the_floor_is_fallen() {
        assert_eq!(assess(&lying_person(), 600.0, &[], 0.3), Ok(CompositePosture::Fallen));
    }

    #[test]
    fn propagates_invalid_geometry() {
        assert!(assess(&lying_person(), 0.0, &[], 0.3).is_err());
    }
}
