use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Keypoint;

/// Detections below this confidence never count as containing the person.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// Furniture a person can legitimately sit or lie on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FurnitureLabel {
    Chair,
    Couch,
    Bed,
    DiningTable,
}

impl FurnitureLabel {
    /// Maps a COCO class id from the segmentation model. Anything that is not
    /// furniture of interest is ignored.
    pub fn from_class_id(class_id: u32) -> Option<Self> {
        match class_id {
            56 => Some(FurnitureLabel::Chair),
            57 => Some(FurnitureLabel::Couch),
            59 => Some(FurnitureLabel::Bed),
            60 => Some(FurnitureLabel::DiningTable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FurnitureLabel::Chair => "chair",
            FurnitureLabel::Couch => "couch",
            FurnitureLabel::Bed => "bed",
            FurnitureLabel::DiningTable => "dining_table",
        }
    }
}

impl fmt::Display for FurnitureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned rectangle, serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, point: Keypoint) -> bool {
        self.x1 <= point.x && point.x <= self.x2 && self.y1 <= point.y && point.y <= self.y2
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bounds: BoundingBox) -> Self {
        [bounds.x1, bounds.y1, bounds.x2, bounds.y2]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FurnitureBox {
    pub label: FurnitureLabel,
    pub bounds: BoundingBox,
    pub confidence: f32,
}

/// A labeled box as produced by the segmentation model, before it is known
/// whether the class is furniture at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub class_id: u32,
    #[serde(rename = "box")]
    pub bounds: BoundingBox,
    pub confidence: f32,
}

impl RawDetection {
    pub fn to_furniture(&self) -> Option<FurnitureBox> {
        FurnitureLabel::from_class_id(self.class_id).map(|label| FurnitureBox {
            label,
            bounds: self.bounds,
            confidence: self.confidence,
        })
    }
}

/// Keeps furniture classes in input order and drops everything else.
pub fn furniture_boxes(detections: &[RawDetection]) -> Vec<FurnitureBox> {
    detections.iter().filter_map(RawDetection::to_furniture).collect()
}

/// Returns the label of the first box (in the given order) that contains the
/// point and clears `min_confidence`. No best-overlap search.
pub fn locate(
    boxes: &[FurnitureBox],
    point: Keypoint,
    min_confidence: f32,
) -> Option<FurnitureLabel> {
    boxes
        .iter()
        .filter(|candidate| candidate.confidence >= min_confidence)
        .find(|candidate| candidate.bounds.contains(point))
        .map(|candidate| candidate.label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn furniture(label: FurnitureLabel, bounds: [f32; 4], confidence: f32) -> FurnitureBox {
        FurnitureBox {
            label,
            bounds: bounds.into(),
            confidence,
        }
    }

    #[test]
    fn edges_are_inclusive() {
        let bed = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        assert!(bed.contains(Keypoint::new(10.0, 10.0)));
        assert!(bed.contains(Keypoint::new(50.0, 50.0)));
        assert!(bed.contains(Keypoint::new(10.0, 50.0)));
        assert!(!bed.contains(Keypoint::new(50.01, 30.0)));
        assert!(!bed.contains(Keypoint::new(30.0, 9.99)));
    }

    #[test]
    fn first_match_wins_over_larger_overlap() {
        let boxes = vec![
            furniture(FurnitureLabel::Chair, [90.0, 90.0, 110.0, 110.0], 0.9),
            furniture(FurnitureLabel::Bed, [0.0, 0.0, 500.0, 500.0], 0.9),
        ];
        assert_eq!(
            locate(&boxes, Keypoint::new(100.0, 100.0), 0.3),
            Some(FurnitureLabel::Chair)
        );
    }

    #[test]
    fn skips_low_confidence_boxes() {
        let boxes = vec![
            furniture(FurnitureLabel::Couch, [0.0, 0.0, 200.0, 200.0], 0.1),
            furniture(FurnitureLabel::Bed, [0.0, 0.0, 200.0, 200.0], 0.8),
        ];
        assert_eq!(
            locate(&boxes, Keypoint::new(50.0, 50.0), 0.3),
            Some(FurnitureLabel::Bed)
        );
    }

    #[test]
    fn no_boxes_means_no_furniture() {
        assert_eq!(locate(&[], Keypoint::new(1.0, 1.0), 0.0), None);
    }

    #[test]
    fn raw_detections_keep_only_furniture_classes() {
        let detections = vec![
            RawDetection {
                class_id: 0,
                bounds: [0.0, 0.0, 10.0, 10.0].into(),
                confidence: 0.99,
            },
            RawDetection {
                class_id: 59,
                bounds: [0.0, 0.0, 10.0, 10.0].into(),
                confidence: 0.5,
            },
            RawDetection {
                class_id: 58,
                bounds: [0.0, 0.0, 10.0, 10.0].into(),
                confidence: 0.5,
            },
        ];
        let boxes = furniture_boxes(&detections);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, FurnitureLabel::Bed);
    }

    #[test]
    fn raw_detection_reads_box_field() {
        let parsed: RawDetection =
            serde_json::from_str(r#"{"classId":57,"box":[1,2,3,4],"confidence":0.7}"#).unwrap();
        assert_eq!(parsed.bounds, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(parsed.to_furniture().map(|b| b.label), Some(FurnitureLabel::Couch));
    }

    proptest! {
        #[test]
        fn returns_first_containing_box(
            boxes in proptest::collection::vec(
                (0u8..4, 0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0),
                0..8,
            ),
            px in 0.0f32..200.0,
            py in 0.0f32..200.0,
        ) {
            let labels = [
                FurnitureLabel::Chair,
                FurnitureLabel::Couch,
                FurnitureLabel::Bed,
                FurnitureLabel::DiningTable,
            ];
            let boxes: Vec<FurnitureBox> = boxes
                .into_iter()
                .map(|(label, x, y, w, h)| furniture(labels[label as usize], [x, y, x + w, y + h], 1.0))
                .collect();
            let point = Keypoint::new(px, py);
            let expected = boxes.iter().find(|b| b.bounds.contains(point)).map(|b| b.label);
            prop_assert_eq!(locate(&boxes, point, 0.0), expected);
        }
    }
}
