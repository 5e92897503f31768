use std::fmt;

use serde::{Deserialize, Serialize};

use super::furniture::FurnitureLabel;
use super::geometry::BodyPosition;

/// Furniture-aware posture for a single frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "furniture", rename_all = "camelCase")]
pub enum CompositePosture {
    Standing,
    Sitting(Option<FurnitureLabel>),
    Fallen,
    Sleeping(FurnitureLabel),
}

impl CompositePosture {
    pub fn is_fallen(&self) -> bool {
        matches!(self, CompositePosture::Fallen)
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(self, CompositePosture::Sleeping(_))
    }

    /// Standing and every sitting variant count toward sustained activity.
    pub fn is_activity(&self) -> bool {
        matches!(self, CompositePosture::Standing | CompositePosture::Sitting(_))
    }

    pub fn furniture(&self) -> Option<FurnitureLabel> {
        match self {
            CompositePosture::Sitting(furniture) => *furniture,
            CompositePosture::Sleeping(furniture) => Some(*furniture),
            CompositePosture::Standing | CompositePosture::Fallen => None,
        }
    }

    pub fn body_position(&self) -> BodyPosition {
        match self {
            CompositePosture::Standing => BodyPosition::Standing,
            CompositePosture::Sitting(_) => BodyPosition::Sitting,
            CompositePosture::Fallen | CompositePosture::Sleeping(_) => BodyPosition::Fallen,
        }
    }
}

impl fmt::Display for CompositePosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositePosture::Standing => f.write_str("standing"),
            CompositePosture::Sitting(None) => f.write_str("sitting"),
            CompositePosture::Sitting(Some(furniture)) => write!(f, "sitting on {furniture}"),
            CompositePosture::Fallen => f.write_str("fallen"),
            CompositePosture::Sleeping(furniture) => write!(f, "sleeping on {furniture}"),
        }
    }
}

pub fn resolve(position: BodyPosition, furniture: Option<FurnitureLabel>) -> CompositePosture {
    match (position, furniture) {
        (BodyPosition::Fallen, Some(label)) => CompositePosture::Sleeping(label),
        (BodyPosition::Fallen, None) => CompositePosture::Fallen,
        (BodyPosition::Sitting, furniture) => CompositePosture::Sitting(furniture),
        (BodyPosition::Standing, _) => CompositePosture::Standing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONS: [BodyPosition; 3] = [
        BodyPosition::Standing,
        BodyPosition::Sitting,
        BodyPosition::Fallen,
    ];

    #[test]
    fn resolution_table() {
        assert_eq!(
            resolve(BodyPosition::Fallen, Some(FurnitureLabel::Bed)),
            CompositePosture::Sleeping(FurnitureLabel::Bed)
        );
        assert_eq!(resolve(BodyPosition::Fallen, None), CompositePosture::Fallen);
        assert_eq!(
            resolve(BodyPosition::Sitting, Some(FurnitureLabel::Chair)),
            CompositePosture::Sitting(Some(FurnitureLabel::Chair))
        );
        assert_eq!(resolve(BodyPosition::Sitting, None), CompositePosture::Sitting(None));
        assert_eq!(
            resolve(BodyPosition::Standing, Some(FurnitureLabel::Couch)),
            CompositePosture::Standing
        );
        assert_eq!(resolve(BodyPosition::Standing, None), CompositePosture::Standing);
    }

    #[test]
    fn repeated_resolution_is_stable() {
        let furniture = [None, Some(FurnitureLabel::DiningTable)];
        for position in POSITIONS {
            for label in furniture {
                let first = resolve(position, label);
                for _ in 0..3 {
                    assert_eq!(resolve(position, label), first);
                }
                assert_eq!(first.body_position(), position);
            }
        }
    }

    #[test]
    fn serializes_with_furniture_tag() {
        let json = serde_json::to_string(&CompositePosture::Sleeping(FurnitureLabel::Bed)).unwrap();
        assert_eq!(json, r#"{"kind":"sleeping","furniture":"bed"}"#);
        let json = serde_json::to_string(&CompositePosture::Fallen).unwrap();
        assert_eq!(json, r#"{"kind":"fallen"}"#);
    }

    #[test]
    fn display_names_furniture() {
        assert_eq!(
            CompositePosture::Sitting(Some(FurnitureLabel::Couch)).to_string(),
            "sitting on couch"
        );
        assert_eq!(CompositePosture::Sitting(None).to_string(), "sitting");
    }
}
