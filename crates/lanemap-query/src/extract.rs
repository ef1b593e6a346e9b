//! One-pass extraction helpers: layer listings, subtype filters, traffic
//! lights, and stop lines.

use lanemap_core::map::LaneMap;
use lanemap_core::primitives::{CurveId, LaneSegment, attribute};
use lanemap_core::rules::{Maneuver, RightOfWay, RuleElement, TrafficLight, TrafficSign};
use std::collections::BTreeSet;
use tracing::warn;

/// Default sign type of a stop sign.
pub const STOP_SIGN: &str = "stop_sign";

/// All lane segments in the map.
pub fn lane_segments(map: &LaneMap) -> Vec<&LaneSegment> {
    if map.lane_segments.is_empty() {
        warn!("lane segment layer is empty");
    }
    map.lane_segments.values().collect()
}

/// Lane segments whose `subtype` attribute equals `subtype`.
pub fn subtype_lane_segments<'a>(
    segments: &[&'a LaneSegment],
    subtype: &str,
) -> Vec<&'a LaneSegment> {
    segments
        .iter()
        .copied()
        .filter(|segment| segment.subtype() == Some(subtype))
        .collect()
}

/// Lane segments with subtype `road`.
pub fn road_lane_segments<'a>(segments: &[&'a LaneSegment]) -> Vec<&'a LaneSegment> {
    subtype_lane_segments(segments, attribute::SUBTYPE_ROAD)
}

/// Lane segments with subtype `crosswalk`.
pub fn crosswalk_lane_segments<'a>(segments: &[&'a LaneSegment]) -> Vec<&'a LaneSegment> {
    subtype_lane_segments(segments, attribute::SUBTYPE_CROSSWALK)
}

/// Traffic light rules attached to the given segments, deduplicated by id.
pub fn traffic_lights<'a>(map: &'a LaneMap, segments: &[&LaneSegment]) -> Vec<&'a RuleElement> {
    let mut seen = BTreeSet::new();
    let mut lights = Vec::new();
    for segment in segments {
        for &rule_id in &segment.rules {
            let Some(rule) = map.get_rule(rule_id) else {
                continue;
            };
            if rule.behavior_as::<TrafficLight>().is_some() && seen.insert(rule_id) {
                lights.push(rule);
            }
        }
    }
    lights
}

/// Stop lines associated with one lane segment: right-of-way stop lines
/// where the segment yields, traffic light stop lines, and the first ref
/// line of each traffic sign.
pub fn stop_lines_for(map: &LaneMap, segment: &LaneSegment) -> Vec<CurveId> {
    let mut stop_lines = Vec::new();
    for &rule_id in &segment.rules {
        let Some(rule) = map.get_rule(rule_id) else {
            continue;
        };
        if let Some(row) = rule.behavior_as::<RightOfWay>() {
            if row.maneuver(segment.id) == Maneuver::Yield
                && let Some(line) = row.stop_line
            {
                stop_lines.push(line);
            }
        } else if let Some(light) = rule.behavior_as::<TrafficLight>() {
            if let Some(line) = light.stop_line {
                stop_lines.push(line);
            }
        } else if let Some(sign) = rule.behavior_as::<TrafficSign>() {
            // A sign can carry several ref lines; the first is the stop line.
            if let Some(&line) = sign.ref_lines.first() {
                stop_lines.push(line);
            }
        }
    }
    stop_lines
}

/// Stop lines associated with any of the given segments.
pub fn stop_lines(map: &LaneMap, segments: &[&LaneSegment]) -> Vec<CurveId> {
    segments
        .iter()
        .flat_map(|segment| stop_lines_for(map, segment))
        .collect()
}

/// Stop lines of stop signs with the given sign type, deduplicated by id.
pub fn stop_sign_stop_lines(
    map: &LaneMap,
    segments: &[&LaneSegment],
    sign_type: &str,
) -> Vec<CurveId> {
    let mut checklist = BTreeSet::new();
    let mut stop_lines = Vec::new();
    for segment in segments {
        for &rule_id in &segment.rules {
            let Some(sign) = map
                .get_rule(rule_id)
                .and_then(|rule| rule.behavior_as::<TrafficSign>())
            else {
                continue;
            };
            if sign.sign_type != sign_type {
                continue;
            }
            if let Some(&line) = sign.ref_lines.first()
                && checklist.insert(line)
            {
                stop_lines.push(line);
            }
        }
    }
    stop_lines
}
