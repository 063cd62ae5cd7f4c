use geojson::Feature;
use std::collections::HashMap;

/// Sentinel used upstream for records whose region could not be
/// determined. Never enters the case index and never matches.
pub const UNKNOWN_REGION: &str = "未知";

/// Case counts keyed by canonical region name, built once per render
/// pass. Insertion order is preserved so containment matching is
/// deterministic; re-inserting a key overwrites its count
/// (last-write-wins, duplicates are not expected upstream).
#[derive(Debug, Clone, Default)]
pub struct CaseIndex {
    keys: Vec<String>,
    counts: HashMap<String, u64>,
}

impl CaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region_name: &str, case_count: u64) {
        if region_name.is_empty() || region_name == UNKNOWN_REGION {
            return;
        }
        if self.counts.insert(region_name.to_string(), case_count).is_none() {
            self.keys.push(region_name.to_string());
        }
    }

    pub fn get(&self, region_name: &str) -> Option<u64> {
        self.counts.get(region_name).copied()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }
}

/// A boundary feature resolved against the case index. Unmatched
/// features keep their raw name with a count of zero so the map still
/// shows every region.
#[derive(Debug, Clone)]
pub struct MatchedFeature {
    pub feature: Feature,
    /// The raw name as it appears in the boundary properties; used as
    /// the Plotly location id.
    pub location_name: String,
    pub resolved_name: String,
    pub case_count: u64,
}

/// Geographic display window for one choropleth render.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportBounds {
    pub lat_range: [f64; 2],
    pub lon_range: [f64; 2],
    pub center_lat: f64,
    pub center_lon: f64,
    pub pixel_height: f64,
}
