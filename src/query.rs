// src/query.rs
use crate::models::{ClassLabel, FilterState};
use std::collections::BTreeMap;

/// Lower bound sent for an enabled class without an explicit minimum.
pub const CLASS_MIN_SENTINEL: u32 = 0;
/// Upper bound sent for an enabled class without an explicit maximum.
/// Stands in for "unbounded" until the history service accepts open ranges.
pub const CLASS_MAX_SENTINEL: u32 = 1000;

pub type QueryParams = BTreeMap<String, String>;

/// Maps a filter onto the query parameters of the history endpoint.
///
/// Scalar constraints are only emitted when set. Every known class always gets
/// a `min_*`/`max_*` pair: the requested range (with sentinel defaults) when the
/// class is enabled, and `0..0` when it is disabled so that records containing
/// that class are excluded.
pub fn build_query(filter: &FilterState) -> QueryParams {
    let mut params = QueryParams::new();

    if let Some(id) = filter.detection_id.as_deref().map(str::trim) {
        if !id.is_empty() {
            params.insert("detection_id".to_string(), id.to_string());
        }
    }
    if let Some(start) = filter.date_range.start {
        params.insert("start_date".to_string(), start.format("%Y-%m-%d").to_string());
    }
    if let Some(end) = filter.date_range.end {
        params.insert("end_date".to_string(), end.format("%Y-%m-%d").to_string());
    }
    if let Some(min) = filter.object_count.min {
        params.insert("min_objects".to_string(), min.to_string());
    }
    if let Some(max) = filter.object_count.max {
        params.insert("max_objects".to_string(), max.to_string());
    }

    for label in ClassLabel::ALL {
        let range = filter.class_range(label);
        let (min, max) = if range.enabled {
            (
                range.min.unwrap_or(CLASS_MIN_SENTINEL),
                range.max.unwrap_or(CLASS_MAX_SENTINEL),
            )
        } else {
            (0, 0)
        };
        params.insert(format!("min_{}", label.api_key()), min.to_string());
        params.insert(format!("max_{}", label.api_key()), max.to_string());
    }

    params
}
