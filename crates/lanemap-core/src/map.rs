//! The layered lane-network map.
//!
//! Five id-indexed layers with existence checks and reverse-usage lookups.
//! The map is a plain value: build it up front, then hand out `&LaneMap` to
//! queries; the borrow keeps it a stable snapshot for the query's lifetime.

use crate::primitives::{
    Area, AreaId, Curve, CurveId, Id, LaneSegment, LaneSegmentId, Point, PointId, RuleId,
};
use crate::rules::RuleElement;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from map mutation. Registering an entity whose id already exists
/// or whose children are not in the map is a caller bug and fails fast.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("duplicate id {id} in {layer} layer")]
    DuplicateId { layer: &'static str, id: Id },
    #[error("{owner_layer} {owner} references missing {layer} id {id}")]
    MissingReference {
        owner_layer: &'static str,
        owner: Id,
        layer: &'static str,
        id: Id,
    },
}

/// A layered lane-network map.
///
/// Layers are public for direct inspection and for constructing unusual
/// states in tests; the `add_*` methods are the validated path. Removal does
/// not cascade: an owner may keep naming a removed id, which queries
/// tolerate by re-checking existence before recording anything.
#[derive(Debug, Default, Clone)]
pub struct LaneMap {
    pub points: BTreeMap<PointId, Point>,
    pub curves: BTreeMap<CurveId, Curve>,
    pub lane_segments: BTreeMap<LaneSegmentId, LaneSegment>,
    pub areas: BTreeMap<AreaId, Area>,
    pub rules: BTreeMap<RuleId, RuleElement>,
}

impl LaneMap {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Validated registration
    // -----------------------------------------------------------------

    pub fn add_point(&mut self, point: Point) -> Result<(), MapError> {
        if self.points.contains_key(&point.id) {
            return Err(MapError::DuplicateId {
                layer: "point",
                id: point.id.0,
            });
        }
        self.points.insert(point.id, point);
        Ok(())
    }

    pub fn add_curve(&mut self, curve: Curve) -> Result<(), MapError> {
        if self.curves.contains_key(&curve.id) {
            return Err(MapError::DuplicateId {
                layer: "curve",
                id: curve.id.0,
            });
        }
        for &point in &curve.points {
            if !self.points.contains_key(&point) {
                return Err(MapError::MissingReference {
                    owner_layer: "curve",
                    owner: curve.id.0,
                    layer: "point",
                    id: point.0,
                });
            }
        }
        self.curves.insert(curve.id, curve);
        Ok(())
    }

    pub fn add_lane_segment(&mut self, segment: LaneSegment) -> Result<(), MapError> {
        if self.lane_segments.contains_key(&segment.id) {
            return Err(MapError::DuplicateId {
                layer: "lane_segment",
                id: segment.id.0,
            });
        }
        for curve in segment.boundaries() {
            if !self.curves.contains_key(&curve) {
                return Err(MapError::MissingReference {
                    owner_layer: "lane_segment",
                    owner: segment.id.0,
                    layer: "curve",
                    id: curve.0,
                });
            }
        }
        for &rule in &segment.rules {
            if !self.rules.contains_key(&rule) {
                return Err(MapError::MissingReference {
                    owner_layer: "lane_segment",
                    owner: segment.id.0,
                    layer: "rule",
                    id: rule.0,
                });
            }
        }
        self.lane_segments.insert(segment.id, segment);
        Ok(())
    }

    pub fn add_area(&mut self, area: Area) -> Result<(), MapError> {
        if self.areas.contains_key(&area.id) {
            return Err(MapError::DuplicateId {
                layer: "area",
                id: area.id.0,
            });
        }
        for curve in area.boundary_curves() {
            if !self.curves.contains_key(&curve) {
                return Err(MapError::MissingReference {
                    owner_layer: "area",
                    owner: area.id.0,
                    layer: "curve",
                    id: curve.0,
                });
            }
        }
        for &rule in &area.rules {
            if !self.rules.contains_key(&rule) {
                return Err(MapError::MissingReference {
                    owner_layer: "area",
                    owner: area.id.0,
                    layer: "rule",
                    id: rule.0,
                });
            }
        }
        self.areas.insert(area.id, area);
        Ok(())
    }

    pub fn add_rule(&mut self, rule: RuleElement) -> Result<(), MapError> {
        if self.rules.contains_key(&rule.id) {
            return Err(MapError::DuplicateId {
                layer: "rule",
                id: rule.id.0,
            });
        }
        let targets = rule.targets();
        let owner = rule.id.0;
        let check = |present: bool, layer: &'static str, id: Id| {
            if present {
                Ok(())
            } else {
                Err(MapError::MissingReference {
                    owner_layer: "rule",
                    owner,
                    layer,
                    id,
                })
            }
        };
        for &id in &targets.points {
            check(self.points.contains_key(&id), "point", id.0)?;
        }
        for &id in &targets.curves {
            check(self.curves.contains_key(&id), "curve", id.0)?;
        }
        for &id in &targets.lane_segments {
            check(self.lane_segments.contains_key(&id), "lane_segment", id.0)?;
        }
        for &id in &targets.areas {
            check(self.areas.contains_key(&id), "area", id.0)?;
        }
        for &id in &targets.rules {
            check(self.rules.contains_key(&id), "rule", id.0)?;
        }
        self.rules.insert(rule.id, rule);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Removal (no cascade)
    // -----------------------------------------------------------------

    pub fn remove_point(&mut self, id: PointId) -> Option<Point> {
        self.points.remove(&id)
    }

    pub fn remove_curve(&mut self, id: CurveId) -> Option<Curve> {
        self.curves.remove(&id)
    }

    pub fn remove_lane_segment(&mut self, id: LaneSegmentId) -> Option<LaneSegment> {
        self.lane_segments.remove(&id)
    }

    pub fn remove_area(&mut self, id: AreaId) -> Option<Area> {
        self.areas.remove(&id)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Option<RuleElement> {
        self.rules.remove(&id)
    }

    // -----------------------------------------------------------------
    // Existence and access
    // -----------------------------------------------------------------

    pub fn contains_point(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    pub fn contains_curve(&self, id: CurveId) -> bool {
        self.curves.contains_key(&id)
    }

    pub fn contains_lane_segment(&self, id: LaneSegmentId) -> bool {
        self.lane_segments.contains_key(&id)
    }

    pub fn contains_area(&self, id: AreaId) -> bool {
        self.areas.contains_key(&id)
    }

    pub fn contains_rule(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    pub fn get_point(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    pub fn get_curve(&self, id: CurveId) -> Option<&Curve> {
        self.curves.get(&id)
    }

    pub fn get_lane_segment(&self, id: LaneSegmentId) -> Option<&LaneSegment> {
        self.lane_segments.get(&id)
    }

    pub fn get_area(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(&id)
    }

    pub fn get_rule(&self, id: RuleId) -> Option<&RuleElement> {
        self.rules.get(&id)
    }

    // -----------------------------------------------------------------
    // Reverse-usage lookups, one per arrow of the ownership model.
    // One-pass scans over the owning layer: never stale with respect to
    // current layer contents.
    // -----------------------------------------------------------------

    /// Curves whose polyline contains `id`.
    pub fn curves_using_point(&self, id: PointId) -> Vec<CurveId> {
        self.curves
            .values()
            .filter(|curve| curve.points.contains(&id))
            .map(|curve| curve.id)
            .collect()
    }

    /// Lane segments with `id` as a boundary.
    pub fn lane_segments_using_curve(&self, id: CurveId) -> Vec<LaneSegmentId> {
        self.lane_segments
            .values()
            .filter(|segment| segment.left == id || segment.right == id)
            .map(|segment| segment.id)
            .collect()
    }

    /// Areas with `id` in any boundary loop.
    pub fn areas_using_curve(&self, id: CurveId) -> Vec<AreaId> {
        self.areas
            .values()
            .filter(|area| area.boundary_curves().any(|curve| curve == id))
            .map(|area| area.id)
            .collect()
    }

    /// Rules referencing `id` through any role.
    pub fn rules_using_curve(&self, id: CurveId) -> Vec<RuleId> {
        self.rules
            .values()
            .filter(|rule| rule.targets().curves.contains(&id))
            .map(|rule| rule.id)
            .collect()
    }

    /// Lane segments with `id` attached.
    pub fn lane_segments_using_rule(&self, id: RuleId) -> Vec<LaneSegmentId> {
        self.lane_segments
            .values()
            .filter(|segment| segment.rules.contains(&id))
            .map(|segment| segment.id)
            .collect()
    }

    /// Areas with `id` attached.
    pub fn areas_using_rule(&self, id: RuleId) -> Vec<AreaId> {
        self.areas
            .values()
            .filter(|area| area.rules.contains(&id))
            .map(|area| area.id)
            .collect()
    }
}
