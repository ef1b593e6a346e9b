//! Reference queries: find every top-level object that depends on a
//! primitive, directly or transitively, by walking ownership relations
//! across the map's layers.
//!
//! The walk ascends from a primitive through its owners until it reaches
//! entities nothing owns (lane segments, areas, free-standing curves and
//! rules) and records those. The downward direction expands a container
//! into everything it is built from and is exposed as a first-class
//! capability via [`walk`]; [`find_references`] always enters upward.

use lanemap_core::map::LaneMap;
use lanemap_core::primitives::{AreaId, CurveId, LaneSegmentId, PointId, RuleId};
use lanemap_core::rules::RuleVisitor;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward owners: who uses this primitive.
    Upstream,
    /// Toward children: what this primitive is built from.
    Downstream,
}

/// Handle to a primitive in one of the map's layers. The closed set of
/// variants means a query can only ever be asked about a layer the map
/// knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveRef {
    Point(PointId),
    Curve(CurveId),
    LaneSegment(LaneSegmentId),
    Area(AreaId),
    Rule(RuleId),
}

/// Identity-deduplicated result of a reference walk, one set per top-level
/// layer. Membership is keyed by id, so the same entity reached over
/// different paths appears once.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSet {
    pub curves: BTreeSet<CurveId>,
    pub lane_segments: BTreeSet<LaneSegmentId>,
    pub areas: BTreeSet<AreaId>,
    pub rules: BTreeSet<RuleId>,
}

impl ReferenceSet {
    /// Total number of recorded entities across all four sets.
    pub fn len(&self) -> usize {
        self.curves.len() + self.lane_segments.len() + self.areas.len() + self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Find every top-level object that depends on `primitive`.
///
/// An id absent from its layer yields an empty result; it is never an
/// error.
pub fn find_references(map: &LaneMap, primitive: PrimitiveRef) -> ReferenceSet {
    walk(map, primitive, Direction::Upstream)
}

/// Run a reference walk in an explicit direction.
///
/// `Direction::Upstream` is the [`find_references`] entry point;
/// `Direction::Downstream` expands a container into its own references
/// (boundaries, loops, rule roles) for composed queries.
pub fn walk(map: &LaneMap, primitive: PrimitiveRef, direction: Direction) -> ReferenceSet {
    debug!(?primitive, ?direction, "reference walk");
    let mut walker = Walker {
        map,
        refs: ReferenceSet::default(),
        visited_up: HashSet::new(),
        visited_down: HashSet::new(),
    };
    walker.visit(primitive, direction);
    walker.refs
}

struct Walker<'a> {
    map: &'a LaneMap,
    refs: ReferenceSet,
    // The ownership graph is assumed acyclic; the per-direction visited
    // sets keep a malformed map from overflowing the stack and skip
    // re-expansion of shared subtrees.
    visited_up: HashSet<PrimitiveRef>,
    visited_down: HashSet<PrimitiveRef>,
}

impl Walker<'_> {
    fn visit(&mut self, primitive: PrimitiveRef, direction: Direction) {
        match (primitive, direction) {
            // Nothing sits below a point, so a point always ascends.
            (PrimitiveRef::Point(id), _) => self.point_up(id),
            (PrimitiveRef::Curve(id), Direction::Upstream) => self.curve_up(id),
            (PrimitiveRef::Curve(id), Direction::Downstream) => self.curve_down(id),
            (PrimitiveRef::LaneSegment(id), Direction::Upstream) => self.lane_segment_up(id),
            (PrimitiveRef::LaneSegment(id), Direction::Downstream) => self.lane_segment_down(id),
            (PrimitiveRef::Area(id), Direction::Upstream) => self.area_up(id),
            (PrimitiveRef::Area(id), Direction::Downstream) => self.area_down(id),
            (PrimitiveRef::Rule(id), Direction::Upstream) => self.rule_up(id),
            (PrimitiveRef::Rule(id), Direction::Downstream) => self.rule_down(id),
        }
    }

    fn point_up(&mut self, id: PointId) {
        if !self.visited_up.insert(PrimitiveRef::Point(id)) {
            return;
        }
        // An unowned point carries no map semantics on its own: nothing to
        // record, nowhere to go.
        for curve in self.map.curves_using_point(id) {
            self.curve_up(curve);
        }
    }

    fn curve_up(&mut self, id: CurveId) {
        if !self.visited_up.insert(PrimitiveRef::Curve(id)) {
            return;
        }
        let segments = self.map.lane_segments_using_curve(id);
        let areas = self.map.areas_using_curve(id);
        let rules = self.map.rules_using_curve(id);
        for &segment in &segments {
            self.lane_segment_up(segment);
        }
        for &area in &areas {
            self.area_up(area);
        }
        for &rule in &rules {
            self.rule_up(rule);
        }
        // A curve no one owns is itself a top-level result, provided it is
        // still present in its layer.
        if segments.is_empty()
            && areas.is_empty()
            && rules.is_empty()
            && self.map.contains_curve(id)
        {
            trace!(curve = id.0, "free-standing curve recorded");
            self.refs.curves.insert(id);
        }
    }

    fn curve_down(&mut self, id: CurveId) {
        if !self.visited_down.insert(PrimitiveRef::Curve(id)) {
            return;
        }
        let map = self.map;
        let Some(curve) = map.get_curve(id) else {
            return;
        };
        for &point in &curve.points {
            self.point_up(point);
        }
    }

    fn lane_segment_up(&mut self, id: LaneSegmentId) {
        if !self.visited_up.insert(PrimitiveRef::LaneSegment(id)) {
            return;
        }
        // Nothing owns a lane segment: record and stop.
        if self.map.contains_lane_segment(id) {
            trace!(lane_segment = id.0, "recorded");
            self.refs.lane_segments.insert(id);
        }
    }

    fn lane_segment_down(&mut self, id: LaneSegmentId) {
        if !self.visited_down.insert(PrimitiveRef::LaneSegment(id)) {
            return;
        }
        let map = self.map;
        let Some(segment) = map.get_lane_segment(id) else {
            return;
        };
        self.curve_down(segment.left);
        self.curve_down(segment.right);
        for &rule in &segment.rules {
            self.rule_down(rule);
        }
    }

    fn area_up(&mut self, id: AreaId) {
        if !self.visited_up.insert(PrimitiveRef::Area(id)) {
            return;
        }
        // Nothing owns an area: record and stop.
        if self.map.contains_area(id) {
            trace!(area = id.0, "recorded");
            self.refs.areas.insert(id);
        }
    }

    fn area_down(&mut self, id: AreaId) {
        if !self.visited_down.insert(PrimitiveRef::Area(id)) {
            return;
        }
        let map = self.map;
        let Some(area) = map.get_area(id) else {
            return;
        };
        for curve in area.boundary_curves() {
            self.curve_down(curve);
        }
        for &rule in &area.rules {
            self.rule_down(rule);
        }
    }

    fn rule_up(&mut self, id: RuleId) {
        if !self.visited_up.insert(PrimitiveRef::Rule(id)) {
            return;
        }
        let segments = self.map.lane_segments_using_rule(id);
        let areas = self.map.areas_using_rule(id);
        for &segment in &segments {
            self.lane_segment_up(segment);
        }
        for &area in &areas {
            self.area_up(area);
        }
        // An owned rule is subsumed by its owners; only a free-standing
        // rule still present in its layer is a result of its own.
        if segments.is_empty() && areas.is_empty() && self.map.contains_rule(id) {
            trace!(rule = id.0, "free-standing rule recorded");
            self.refs.rules.insert(id);
        }
    }

    fn rule_down(&mut self, id: RuleId) {
        if !self.visited_down.insert(PrimitiveRef::Rule(id)) {
            return;
        }
        let map = self.map;
        let Some(rule) = map.get_rule(id) else {
            return;
        };
        rule.behavior.accept(&mut RoleExpansion { walker: self });
    }
}

/// Feeds every primitive referenced by a rule's roles back into the
/// downward walk.
struct RoleExpansion<'w, 'a> {
    walker: &'w mut Walker<'a>,
}

impl RuleVisitor for RoleExpansion<'_, '_> {
    fn visit_point(&mut self, id: PointId) {
        self.walker.point_up(id);
    }

    fn visit_curve(&mut self, id: CurveId) {
        self.walker.curve_down(id);
    }

    fn visit_lane_segment(&mut self, id: LaneSegmentId) {
        self.walker.lane_segment_down(id);
    }

    fn visit_area(&mut self, id: AreaId) {
        self.walker.area_down(id);
    }

    fn visit_rule(&mut self, id: RuleId) {
        self.walker.rule_down(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanemap_core::primitives::{Area, Curve, LaneSegment, Point};
    use lanemap_core::rules::{RightOfWay, RuleBehavior, RuleElement, TrafficLight};

    fn add_curve(map: &mut LaneMap, curve: i64, points: &[i64]) {
        for &p in points {
            if !map.contains_point(PointId(p)) {
                map.add_point(Point::new(PointId(p), 0.0, 0.0, 0.0)).unwrap();
            }
        }
        map.add_curve(Curve::new(
            CurveId(curve),
            points.iter().map(|&p| PointId(p)).collect(),
        ))
        .unwrap();
    }

    /// Lane segment L1 with boundaries c1, c2 (points 1..=4).
    fn single_segment_map() -> LaneMap {
        let mut map = LaneMap::new();
        add_curve(&mut map, 1, &[1, 2]);
        add_curve(&mut map, 2, &[3, 4]);
        map.add_lane_segment(LaneSegment::new(LaneSegmentId(100), CurveId(1), CurveId(2)))
            .unwrap();
        map
    }

    #[test]
    fn test_upward_completeness_boundary_curve() {
        let map = single_segment_map();
        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(1)));
        assert!(refs.lane_segments.contains(&LaneSegmentId(100)));
        assert!(refs.curves.is_empty());
    }

    #[test]
    fn test_point_resolves_through_curve_to_segment() {
        let map = single_segment_map();
        let refs = find_references(&map, PrimitiveRef::Point(PointId(1)));
        assert_eq!(refs.lane_segments, BTreeSet::from([LaneSegmentId(100)]));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_orphan_point_yields_empty_set() {
        let mut map = single_segment_map();
        map.add_point(Point::new(PointId(99), 5.0, 5.0, 0.0)).unwrap();
        let refs = find_references(&map, PrimitiveRef::Point(PointId(99)));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_missing_id_yields_empty_set() {
        let map = single_segment_map();
        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(777)));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_free_standing_curve_recorded() {
        let mut map = single_segment_map();
        add_curve(&mut map, 3, &[5, 6]);
        // No segment, area, or rule owns curve 3.
        assert!(map.lane_segments_using_curve(CurveId(3)).is_empty());
        assert!(map.areas_using_curve(CurveId(3)).is_empty());
        assert!(map.rules_using_curve(CurveId(3)).is_empty());

        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(3)));
        assert_eq!(refs.curves, BTreeSet::from([CurveId(3)]));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_removed_curve_not_recorded_as_free_standing() {
        let mut map = single_segment_map();
        add_curve(&mut map, 3, &[5, 6]);
        map.remove_curve(CurveId(3));
        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(3)));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_lane_segment_queried_directly_is_recorded() {
        let map = single_segment_map();
        let refs = find_references(&map, PrimitiveRef::LaneSegment(LaneSegmentId(100)));
        assert_eq!(refs.lane_segments, BTreeSet::from([LaneSegmentId(100)]));
    }

    #[test]
    fn test_area_queried_directly_is_recorded() {
        let mut map = LaneMap::new();
        add_curve(&mut map, 1, &[1, 2]);
        map.add_area(Area::new(AreaId(50), vec![CurveId(1)])).unwrap();
        let refs = find_references(&map, PrimitiveRef::Area(AreaId(50)));
        assert_eq!(refs.areas, BTreeSet::from([AreaId(50)]));
    }

    #[test]
    fn test_idempotence() {
        let mut map = single_segment_map();
        add_curve(&mut map, 3, &[5, 6]);
        map.add_rule(RuleElement::new(
            RuleId(200),
            TrafficLight {
                lights: vec![],
                stop_line: Some(CurveId(3)),
            },
        ))
        .unwrap();
        let first = find_references(&map, PrimitiveRef::Point(PointId(1)));
        let second = find_references(&map, PrimitiveRef::Point(PointId(1)));
        assert_eq!(first, second);
    }

    /// Curve c is a boundary of L1 and referenced by rule R1 attached to a
    /// different segment L2: both segments appear, each exactly once.
    #[test]
    fn test_cross_path_deduplication() {
        let mut map = LaneMap::new();
        add_curve(&mut map, 1, &[1, 2]); // shared curve c
        add_curve(&mut map, 2, &[3, 4]);
        add_curve(&mut map, 3, &[5, 6]);
        add_curve(&mut map, 4, &[7, 8]);
        map.add_lane_segment(LaneSegment::new(LaneSegmentId(100), CurveId(1), CurveId(2)))
            .unwrap();
        map.add_rule(RuleElement::new(
            RuleId(200),
            TrafficLight {
                lights: vec![],
                stop_line: Some(CurveId(1)),
            },
        ))
        .unwrap();
        map.add_lane_segment(
            LaneSegment::new(LaneSegmentId(101), CurveId(3), CurveId(4))
                .with_rules(vec![RuleId(200)]),
        )
        .unwrap();

        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(1)));
        assert_eq!(
            refs.lane_segments,
            BTreeSet::from([LaneSegmentId(100), LaneSegmentId(101)])
        );
        // R1 is owned by L2, so it is subsumed, not recorded.
        assert!(refs.rules.is_empty());
        assert!(refs.curves.is_empty());
    }

    /// L1 has boundaries c1, c2; rule R1 attached to L1 references c3 as a
    /// stop line. Querying c3 resolves its sole owner R1, and because R1 is
    /// owned by L1 the result is exactly {lane_segments: {L1}}.
    #[test]
    fn test_stop_line_scenario_resolves_to_owning_segment() {
        let mut map = single_segment_map();
        add_curve(&mut map, 3, &[5, 6]); // stop line c3, not a boundary
        map.add_rule(RuleElement::new(
            RuleId(200),
            TrafficLight {
                lights: vec![],
                stop_line: Some(CurveId(3)),
            },
        ))
        .unwrap();
        let mut segment = map.remove_lane_segment(LaneSegmentId(100)).unwrap();
        segment.rules = vec![RuleId(200)];
        map.add_lane_segment(segment).unwrap();

        assert_eq!(map.rules_using_curve(CurveId(3)), vec![RuleId(200)]);

        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(3)));
        assert_eq!(refs.lane_segments, BTreeSet::from([LaneSegmentId(100)]));
        assert!(refs.rules.is_empty());
        assert!(refs.curves.is_empty());
        assert!(refs.areas.is_empty());
    }

    #[test]
    fn test_free_standing_rule_recorded() {
        let mut map = LaneMap::new();
        add_curve(&mut map, 1, &[1, 2]);
        map.add_rule(RuleElement::new(
            RuleId(200),
            TrafficLight {
                lights: vec![CurveId(1)],
                stop_line: None,
            },
        ))
        .unwrap();
        let refs = find_references(&map, PrimitiveRef::Rule(RuleId(200)));
        assert_eq!(refs.rules, BTreeSet::from([RuleId(200)]));
    }

    #[test]
    fn test_rule_owned_by_area_resolves_to_area() {
        let mut map = LaneMap::new();
        add_curve(&mut map, 1, &[1, 2]);
        add_curve(&mut map, 2, &[3, 4]);
        map.add_rule(RuleElement::new(
            RuleId(200),
            TrafficLight {
                lights: vec![],
                stop_line: Some(CurveId(2)),
            },
        ))
        .unwrap();
        map.add_area(
            Area::new(AreaId(50), vec![CurveId(1)]).with_rules(vec![RuleId(200)]),
        )
        .unwrap();

        let refs = find_references(&map, PrimitiveRef::Curve(CurveId(2)));
        assert_eq!(refs.areas, BTreeSet::from([AreaId(50)]));
        assert!(refs.rules.is_empty());
    }

    /// Downward expansion of a segment reaches its boundary points, which
    /// ascend back through every curve using them.
    #[test]
    fn test_walk_downstream_expands_rule_roles() {
        let mut map = single_segment_map();
        add_curve(&mut map, 3, &[5, 6]);
        map.add_rule(RuleElement::new(
            RuleId(200),
            RightOfWay {
                priority: vec![],
                yielding: vec![],
                stop_line: Some(CurveId(3)),
            },
        ))
        .unwrap();
        let mut segment = map.remove_lane_segment(LaneSegmentId(100)).unwrap();
        segment.rules = vec![RuleId(200)];
        map.add_lane_segment(segment).unwrap();

        let refs = walk(
            &map,
            PrimitiveRef::LaneSegment(LaneSegmentId(100)),
            Direction::Downstream,
        );
        // The stop line's points have no other owner than R1, whose owner
        // is L1; the boundary points ascend to L1 as well.
        assert_eq!(refs.lane_segments, BTreeSet::from([LaneSegmentId(100)]));
        assert!(refs.rules.is_empty());
    }

    /// A rule kind defined outside the core crate: the visitor seam needs no
    /// change, and the cycle guard keeps a malformed rule-to-rule loop
    /// terminating.
    #[derive(Debug)]
    struct Linked {
        other: RuleId,
    }

    impl RuleBehavior for Linked {
        fn kind(&self) -> &'static str {
            "linked"
        }

        fn accept(&self, visitor: &mut dyn RuleVisitor) {
            visitor.visit_rule(self.other);
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_downstream_rule_cycle_terminates() {
        let mut map = LaneMap::new();
        // Mutually referencing rules cannot be built through add_rule;
        // insert directly to simulate a corrupted map.
        map.rules.insert(
            RuleId(1),
            RuleElement::new(RuleId(1), Linked { other: RuleId(2) }),
        );
        map.rules.insert(
            RuleId(2),
            RuleElement::new(RuleId(2), Linked { other: RuleId(1) }),
        );
        let refs = walk(&map, PrimitiveRef::Rule(RuleId(1)), Direction::Downstream);
        assert!(refs.is_empty());
    }
}
