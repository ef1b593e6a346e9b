//! Geometric primitives of the lane-network map.
//!
//! Every primitive carries a typed id. Ids are unique within a layer, not
//! across layers: `CurveId(7)` and `LaneSegmentId(7)` name unrelated
//! entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw identifier value shared by all layers.
pub type Id = i64;

/// Id of a [`Point`] in the point layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PointId(pub Id);

/// Id of a [`Curve`] in the curve layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CurveId(pub Id);

/// Id of a [`LaneSegment`] in the lane segment layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct LaneSegmentId(pub Id);

/// Id of an [`Area`] in the area layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AreaId(pub Id);

/// Id of a [`crate::rules::RuleElement`] in the regulatory rule layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RuleId(pub Id);

/// Well-known attribute keys and values.
pub mod attribute {
    pub const SUBTYPE: &str = "subtype";
    pub const SUBTYPE_ROAD: &str = "road";
    pub const SUBTYPE_CROSSWALK: &str = "crosswalk";
}

/// A 3D point. The lowest layer: points own nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(id: PointId, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }
}

/// An ordered polyline over points: lane boundaries, stop lines, sign
/// outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub id: CurveId,
    pub points: Vec<PointId>,
}

impl Curve {
    pub fn new(id: CurveId, points: Vec<PointId>) -> Self {
        Self { id, points }
    }
}

/// A drivable lane segment bounded by a left and right curve, with attached
/// regulatory rules and free-form attributes (`subtype` = `road`,
/// `crosswalk`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSegment {
    pub id: LaneSegmentId,
    pub left: CurveId,
    pub right: CurveId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl LaneSegment {
    pub fn new(id: LaneSegmentId, left: CurveId, right: CurveId) -> Self {
        Self {
            id,
            left,
            right,
            rules: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<RuleId>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Both boundary curves, left first.
    pub fn boundaries(&self) -> [CurveId; 2] {
        [self.left, self.right]
    }

    /// The `subtype` attribute, if set.
    pub fn subtype(&self) -> Option<&str> {
        self.attributes.get(attribute::SUBTYPE).map(String::as_str)
    }
}

/// A closed region: one outer boundary loop and zero or more inner loops
/// (holes), each an ordered sequence of curves, plus attached regulatory
/// rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub outer: Vec<CurveId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner: Vec<Vec<CurveId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleId>,
}

impl Area {
    pub fn new(id: AreaId, outer: Vec<CurveId>) -> Self {
        Self {
            id,
            outer,
            inner: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_inner(mut self, inner: Vec<Vec<CurveId>>) -> Self {
        self.inner = inner;
        self
    }

    pub fn with_rules(mut self, rules: Vec<RuleId>) -> Self {
        self.rules = rules;
        self
    }

    /// Every boundary curve: the outer loop followed by each inner loop.
    pub fn boundary_curves(&self) -> impl Iterator<Item = CurveId> + '_ {
        self.outer
            .iter()
            .copied()
            .chain(self.inner.iter().flatten().copied())
    }
}
