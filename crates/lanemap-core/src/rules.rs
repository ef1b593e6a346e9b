//! Regulatory rule elements: an open, polymorphic family.
//!
//! Each concrete rule kind defines its own named roles (stop lines, sign
//! outlines, yielding lanes, ...) holding primitives of mixed kinds. The
//! [`RuleVisitor`] seam lets callers enumerate everything a rule references
//! without knowing its concrete kind; adding a new kind means implementing
//! [`RuleBehavior`] and nothing else.

use crate::primitives::{AreaId, CurveId, LaneSegmentId, PointId, RuleId};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Callbacks for each primitive kind a rule role may hold. All callbacks
/// default to no-ops so implementors only override what they consume.
pub trait RuleVisitor {
    fn visit_point(&mut self, id: PointId) {
        let _ = id;
    }
    fn visit_curve(&mut self, id: CurveId) {
        let _ = id;
    }
    fn visit_lane_segment(&mut self, id: LaneSegmentId) {
        let _ = id;
    }
    fn visit_area(&mut self, id: AreaId) {
        let _ = id;
    }
    fn visit_rule(&mut self, id: RuleId) {
        let _ = id;
    }
}

/// Behavior of one concrete rule kind.
pub trait RuleBehavior: fmt::Debug + Send + Sync {
    /// Stable kind tag, e.g. `"traffic_light"`.
    fn kind(&self) -> &'static str;

    /// Feed every primitive referenced by any role of this rule to
    /// `visitor`.
    fn accept(&self, visitor: &mut dyn RuleVisitor);

    /// Downcast support for kind-specific extraction.
    fn as_any(&self) -> &dyn Any;
}

/// A regulatory rule in the rule layer: an id plus kind-specific behavior.
#[derive(Debug, Clone)]
pub struct RuleElement {
    pub id: RuleId,
    pub behavior: Arc<dyn RuleBehavior>,
}

impl RuleElement {
    pub fn new(id: RuleId, behavior: impl RuleBehavior + 'static) -> Self {
        Self {
            id,
            behavior: Arc::new(behavior),
        }
    }

    /// The concrete payload, if this rule is of kind `T`.
    pub fn behavior_as<T: RuleBehavior + 'static>(&self) -> Option<&T> {
        self.behavior.as_any().downcast_ref::<T>()
    }

    /// Every primitive this rule references, grouped by kind.
    pub fn targets(&self) -> RuleTargets {
        let mut targets = RuleTargets::default();
        self.behavior.accept(&mut targets);
        targets
    }
}

/// Visitor that collects referenced primitives per kind.
#[derive(Debug, Default, Clone)]
pub struct RuleTargets {
    pub points: Vec<PointId>,
    pub curves: Vec<CurveId>,
    pub lane_segments: Vec<LaneSegmentId>,
    pub areas: Vec<AreaId>,
    pub rules: Vec<RuleId>,
}

impl RuleVisitor for RuleTargets {
    fn visit_point(&mut self, id: PointId) {
        self.points.push(id);
    }
    fn visit_curve(&mut self, id: CurveId) {
        self.curves.push(id);
    }
    fn visit_lane_segment(&mut self, id: LaneSegmentId) {
        self.lane_segments.push(id);
    }
    fn visit_area(&mut self, id: AreaId) {
        self.areas.push(id);
    }
    fn visit_rule(&mut self, id: RuleId) {
        self.rules.push(id);
    }
}

/// A traffic light: light fixtures plus an optional stop line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficLight {
    /// Light fixture outlines.
    pub lights: Vec<CurveId>,
    pub stop_line: Option<CurveId>,
}

impl RuleBehavior for TrafficLight {
    fn kind(&self) -> &'static str {
        "traffic_light"
    }

    fn accept(&self, visitor: &mut dyn RuleVisitor) {
        for &curve in &self.lights {
            visitor.visit_curve(curve);
        }
        if let Some(curve) = self.stop_line {
            visitor.visit_curve(curve);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A traffic sign: sign plate outlines plus reference lines where the sign
/// takes effect (a stop sign's ref line is its stop line).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficSign {
    pub sign_type: String,
    pub signs: Vec<CurveId>,
    pub ref_lines: Vec<CurveId>,
}

impl RuleBehavior for TrafficSign {
    fn kind(&self) -> &'static str {
        "traffic_sign"
    }

    fn accept(&self, visitor: &mut dyn RuleVisitor) {
        for &curve in &self.signs {
            visitor.visit_curve(curve);
        }
        for &curve in &self.ref_lines {
            visitor.visit_curve(curve);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a lane segment must do under a [`RightOfWay`] rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    /// The segment has priority.
    RightOfWay,
    /// The segment must yield.
    Yield,
    /// The segment is not governed by the rule.
    Unknown,
}

/// A right-of-way rule: priority lanes, yielding lanes, and an optional stop
/// line for the yielding side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RightOfWay {
    pub priority: Vec<LaneSegmentId>,
    pub yielding: Vec<LaneSegmentId>,
    pub stop_line: Option<CurveId>,
}

impl RightOfWay {
    /// The maneuver `segment` must perform under this rule.
    pub fn maneuver(&self, segment: LaneSegmentId) -> Maneuver {
        if self.priority.contains(&segment) {
            Maneuver::RightOfWay
        } else if self.yielding.contains(&segment) {
            Maneuver::Yield
        } else {
            Maneuver::Unknown
        }
    }
}

impl RuleBehavior for RightOfWay {
    fn kind(&self) -> &'static str {
        "right_of_way"
    }

    fn accept(&self, visitor: &mut dyn RuleVisitor) {
        for &segment in &self.priority {
            visitor.visit_lane_segment(segment);
        }
        for &segment in &self.yielding {
            visitor.visit_lane_segment(segment);
        }
        if let Some(curve) = self.stop_line {
            visitor.visit_curve(curve);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A speed limit posted by zero or more signs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimit {
    pub limit_kmh: f64,
    pub signs: Vec<CurveId>,
}

impl RuleBehavior for SpeedLimit {
    fn kind(&self) -> &'static str {
        "speed_limit"
    }

    fn accept(&self, visitor: &mut dyn RuleVisitor) {
        for &curve in &self.signs {
            visitor.visit_curve(curve);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_enumerates_every_role() {
        let rule = RuleElement::new(
            RuleId(1),
            RightOfWay {
                priority: vec![LaneSegmentId(10)],
                yielding: vec![LaneSegmentId(11), LaneSegmentId(12)],
                stop_line: Some(CurveId(20)),
            },
        );
        let targets = rule.targets();
        assert_eq!(
            targets.lane_segments,
            vec![LaneSegmentId(10), LaneSegmentId(11), LaneSegmentId(12)]
        );
        assert_eq!(targets.curves, vec![CurveId(20)]);
        assert!(targets.points.is_empty());
        assert!(targets.areas.is_empty());
    }

    #[test]
    fn test_behavior_downcast() {
        let rule = RuleElement::new(
            RuleId(2),
            TrafficLight {
                lights: vec![CurveId(5)],
                stop_line: None,
            },
        );
        assert!(rule.behavior_as::<TrafficLight>().is_some());
        assert!(rule.behavior_as::<TrafficSign>().is_none());
        assert_eq!(rule.behavior.kind(), "traffic_light");
    }

    #[test]
    fn test_right_of_way_maneuver() {
        let row = RightOfWay {
            priority: vec![LaneSegmentId(1)],
            yielding: vec![LaneSegmentId(2)],
            stop_line: None,
        };
        assert_eq!(row.maneuver(LaneSegmentId(1)), Maneuver::RightOfWay);
        assert_eq!(row.maneuver(LaneSegmentId(2)), Maneuver::Yield);
        assert_eq!(row.maneuver(LaneSegmentId(3)), Maneuver::Unknown);
    }
}
