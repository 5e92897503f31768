use serde::{Deserialize, Serialize};

use super::PostureError;

/// Vertical extent (as a share of frame height) above which a person is standing.
pub const STANDING_RATIO: f32 = 0.45;
/// Vertical extent below which a person is lying down.
pub const SITTING_RATIO: f32 = 0.25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Keypoint {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Keypoints for a single detected person, head-adjacent point first and
/// foot-adjacent point last.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct KeypointSet(Vec<Keypoint>);

impl KeypointSet {
    pub fn new(points: Vec<Keypoint>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Keypoint] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Arithmetic mean of every keypoint. Undetected joints reported at the
    /// origin are included, matching what the pose model hands back.
    pub fn centroid(&self) -> Option<Keypoint> {
        if self.0.is_empty() {
            return None;
        }
        let count = self.0.len() as f32;
        let (sum_x, sum_y) = self
            .0
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Keypoint::new(sum_x / count, sum_y / count))
    }
}

impl FromIterator<Keypoint> for KeypointSet {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BodyPosition {
    Standing,
    Sitting,
    Fallen,
}

impl BodyPosition {
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio > STANDING_RATIO {
            BodyPosition::Standing
        } else if ratio >= SITTING_RATIO {
            BodyPosition::Sitting
        } else {
            BodyPosition::Fallen
        }
    }
}

/// `(y_last - y_first) / frame_height` for a person's keypoints.
pub fn vertical_ratio(keypoints: &KeypointSet, frame_height: f32) -> Result<f32, PostureError> {
    if !frame_height.is_finite() || frame_height <= 0.0 {
        return Err(PostureError::InvalidInput(format!(
            "frame height must be positive, got {frame_height}"
        )));
    }

    let (Some(head), Some(foot)) = (keypoints.points().first(), keypoints.points().last()) else {
        return Err(PostureError::InvalidInput(
            "person detected with an empty keypoint set".into(),
        ));
    };

    let ratio = (foot.y - head.y) / frame_height;
    if !ratio.is_finite() {
        return Err(PostureError::InvalidInput(format!(
            "non-finite keypoint coordinates (head y={}, foot y={})",
            head.y, foot.y
        )));
    }

    Ok(ratio)
}

pub fn classify(keypoints: &KeypointSet, frame_height: f32) -> Result<BodyPosition, PostureError> {
    vertical_ratio(keypoints, frame_height).map(BodyPosition::from_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn person(head_y: f32, foot_y: f32) -> KeypointSet {
        KeypointSet::new(vec![
            Keypoint::new(100.0, head_y),
            Keypoint::new(110.0, (head_y + foot_y) / 2.0),
            Keypoint::new(120.0, foot_y),
        ])
    }

    #[test]
    fn boundaries_are_inclusive_for_sitting() {
        assert_eq!(BodyPosition::from_ratio(0.45), BodyPosition::Sitting);
        assert_eq!(BodyPosition::from_ratio(0.25), BodyPosition::Sitting);
        assert_eq!(BodyPosition::from_ratio(0.4501), BodyPosition::Standing);
        assert_eq!(BodyPosition::from_ratio(0.2499), BodyPosition::Fallen);
    }

    #[test]
    fn classifies_from_keypoints() {
        assert_eq!(classify(&person(100.0, 400.0), 600.0).unwrap(), BodyPosition::Standing);
        assert_eq!(classify(&person(200.0, 420.0), 600.0).unwrap(), BodyPosition::Sitting);
        assert_eq!(classify(&person(400.0, 460.0), 600.0).unwrap(), BodyPosition::Fallen);
    }

    #[test]
    fn feet_above_head_reads_as_fallen() {
        assert_eq!(classify(&person(400.0, 100.0), 600.0).unwrap(), BodyPosition::Fallen);
    }

    #[test]
    fn rejects_degenerate_frame_height() {
        assert!(matches!(
            classify(&person(0.0, 100.0), 0.0),
            Err(PostureError::InvalidInput(_))
        ));
        assert!(matches!(
            classify(&person(0.0, 100.0), f32::NAN),
            Err(PostureError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_empty_keypoints() {
        assert!(matches!(
            classify(&KeypointSet::default(), 480.0),
            Err(PostureError::InvalidInput(_))
        ));
    }

    #[test]
    fn centroid_is_mean_of_all_points() {
        let set = KeypointSet::new(vec![
            Keypoint::new(0.0, 0.0),
            Keypoint::new(10.0, 20.0),
            Keypoint::new(20.0, 40.0),
        ]);
        assert_eq!(set.centroid(), Some(Keypoint::new(10.0, 20.0)));
        assert_eq!(KeypointSet::default().centroid(), None);
    }

    proptest! {
        #[test]
        fn ratio_bands_cover_every_value(ratio in -2.0f32..2.0) {
            let position = BodyPosition::from_ratio(ratio);
            if ratio > STANDING_RATIO {
                prop_assert_eq!(position, BodyPosition::Standing);
            } else if ratio >= SITTING_RATIO {
                prop_assert_eq!(position, BodyPosition::Sitting);
            } else {
                prop_assert_eq!(position, BodyPosition::Fallen);
            }
        }
    }
}
