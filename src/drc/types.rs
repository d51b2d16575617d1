//! DRC data types and structures
//!
//! Contains violation and rule definitions for DRC checking.

use crate::board::{Coord, ObjectKind, Point};
use serde::{Deserialize, Serialize};

/// What a violation is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Informational header, not counted
    Notice,
    BrokenTrace,
    TooClose,
    LineTooThin,
    ArcTooThin,
    PinRingTooSmall,
    ViaRingTooSmall,
    PinDrillTooSmall,
    ViaDrillTooSmall,
    PadTooThin,
    SilkTooThin,
    ElementSilkTooThin,
    PolygonClearance,
}

impl ViolationKind {
    pub fn explanation(self) -> &'static str {
        match self {
            ViolationKind::Notice => {
                "DRC only checks copper geometry against the design rules.\n\
                 Shorts and missing connections need the netlist and ratsnest."
            }
            ViolationKind::BrokenTrace => {
                "Insufficient overlap between objects can lead to broken tracks\n\
                 due to registration errors between layers or during imaging."
            }
            ViolationKind::TooClose | ViolationKind::PolygonClearance => {
                "Circuits that are too close may bridge during imaging, etching,\n\
                 plating, or soldering processes resulting in a direct short."
            }
            ViolationKind::LineTooThin | ViolationKind::ArcTooThin => {
                "Process specifications dictate a minimum feature-width\n\
                 that can reliably be reproduced."
            }
            ViolationKind::PinRingTooSmall | ViolationKind::ViaRingTooSmall => {
                "Annular rings that are too small may erode during etching,\n\
                 resulting in a broken connection."
            }
            ViolationKind::PinDrillTooSmall | ViolationKind::ViaDrillTooSmall => {
                "Process rules dictate the minimum drill size which can be used."
            }
            ViolationKind::PadTooThin => {
                "Pads which are too thin may erode during etching,\n\
                 resulting in a broken or unreliable connection."
            }
            ViolationKind::SilkTooThin | ViolationKind::ElementSilkTooThin => {
                "Process specifications dictate a minimum silkscreen feature-width\n\
                 that can reliably be reproduced."
            }
        }
    }
}

/// A reported rule violation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrcViolation {
    pub kind: ViolationKind,
    pub title: String,
    pub explanation: String,
    pub x: Coord,
    pub y: Coord,
    pub angle: f64,
    /// Measured value, when the check measures one
    pub measured: Option<Coord>,
    pub required: Coord,
    /// Implicated objects as (object ID, kind)
    pub objects: Vec<(u64, ObjectKind)>,
}

impl DrcViolation {
    pub fn new(
        kind: ViolationKind,
        title: impl Into<String>,
        at: Point,
        measured: Option<Coord>,
        required: Coord,
        objects: Vec<(u64, ObjectKind)>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            explanation: kind.explanation().to_string(),
            x: at.x,
            y: at.y,
            angle: 0.0,
            measured,
            required,
            objects,
        }
    }

    /// The informational notice emitted ahead of every run
    pub fn notice() -> Self {
        Self::new(
            ViolationKind::Notice,
            "DRC does not check for shorts or missing connections",
            Point::default(),
            None,
            0,
            Vec::new(),
        )
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_notice(&self) -> bool {
        self.kind == ViolationKind::Notice
    }
}

/// Board design rules, nanometres
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignRules {
    /// Minimum copper-to-copper clearance
    pub bloat: Coord,
    /// Minimum overlap between connected copper
    pub shrink: Coord,
    pub min_wid: Coord,
    pub min_slk: Coord,
    pub min_drill: Coord,
    pub min_ring: Coord,
}

impl Default for DesignRules {
    fn default() -> Self {
        Self {
            bloat: 254_000,
            shrink: 254_000,
            min_wid: 254_000,
            min_slk: 254_000,
            min_drill: 381_000, // 15 mil
            min_ring: 254_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_fill_missing_fields_with_defaults() {
        let rules: DesignRules = serde_json::from_str(r#"{"bloat": 127000}"#).unwrap();
        assert_eq!(rules.bloat, 127_000);
        assert_eq!(rules.min_drill, 381_000);
        assert_eq!(rules.shrink, DesignRules::default().shrink);
    }

    #[test]
    fn test_violation_serializes_objects() {
        let v = DrcViolation::new(
            ViolationKind::TooClose,
            "Copper areas too close",
            Point::new(5, 6),
            None,
            127_000,
            vec![(3, ObjectKind::Line), (9, ObjectKind::Pin)],
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "too_close");
        assert_eq!(json["objects"][1][1], "Pin");
        assert_eq!(v.object_count(), 2);
    }
}
