use crate::config::MapConfig;
use crate::matching;
use crate::types::{MatchedFeature, ViewportBounds};
use geojson::Value;
use std::collections::HashMap;

/// Running min/max over coordinate pairs that survive the sanity
/// window.
#[derive(Debug)]
struct Extent {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
    count: usize,
}

impl Extent {
    fn new() -> Self {
        Self {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            count: 0,
        }
    }

    fn add(&mut self, position: &[f64], cfg: &MapConfig) {
        if position.len() < 2 {
            return;
        }
        let (lon, lat) = (position[0], position[1]);
        if !lon.is_finite() || !lat.is_finite() {
            return;
        }
        if lat < cfg.lat_limits[0]
            || lat > cfg.lat_limits[1]
            || lon < cfg.lon_limits[0]
            || lon > cfg.lon_limits[1]
        {
            return;
        }
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.count += 1;
    }

    fn collect(&mut self, value: &Value, cfg: &MapConfig) {
        match value {
            Value::Point(pos) => self.add(pos, cfg),
            Value::MultiPoint(positions) | Value::LineString(positions) => {
                for pos in positions {
                    self.add(pos, cfg);
                }
            }
            Value::MultiLineString(rings) | Value::Polygon(rings) => {
                for ring in rings {
                    for pos in ring {
                        self.add(pos, cfg);
                    }
                }
            }
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    for ring in rings {
                        for pos in ring {
                            self.add(pos, cfg);
                        }
                    }
                }
            }
            Value::GeometryCollection(geometries) => {
                for geometry in geometries {
                    self.collect(&geometry.value, cfg);
                }
            }
        }
    }
}

/// Computes the display window for a choropleth render: a bounding box
/// over every matched feature, stretched to the container's aspect
/// ratio so the map is not distorted, with a small padding margin.
/// Never fails; degenerate input falls back to a fixed per-region box.
pub fn compute(
    features: &[MatchedFeature],
    region: Option<&str>,
    cfg: &MapConfig,
) -> ViewportBounds {
    let mut extent = Extent::new();
    for matched in features {
        if let Some(geometry) = &matched.feature.geometry {
            extent.collect(&geometry.value, cfg);
        }
    }

    let (mut min_lat, mut max_lat, min_lon, max_lon) = if extent.count > 0 {
        (extent.min_lat, extent.max_lat, extent.min_lon, extent.max_lon)
    } else {
        let b = region_entry(&cfg.fallback_bounds, region)
            .copied()
            .unwrap_or(cfg.default_bounds);
        (b[0], b[1], b[2], b[3])
    };

    // Floor avoids a degenerate zero-height span for tiny regions.
    let lat_span = (max_lat - min_lat).max(0.1);
    let pixel_height =
        (lat_span * cfg.pixels_per_degree).clamp(cfg.min_height, cfg.max_height);

    let aspect_ratio = cfg.container_width / pixel_height;
    let target_lon_span = lat_span * aspect_ratio;

    let mut center_lon = (min_lon + max_lon) / 2.0;
    let mut center_lat = (min_lat + max_lat) / 2.0;
    if let Some(&[lon_offset, lat_offset]) = region_entry(&cfg.recenter, region) {
        center_lon += lon_offset;
        center_lat += lat_offset;
    }
    let mut vp_min_lon = center_lon - target_lon_span / 2.0;
    let mut vp_max_lon = center_lon + target_lon_span / 2.0;

    vp_min_lon -= target_lon_span * cfg.padding;
    vp_max_lon += target_lon_span * cfg.padding;
    min_lat -= lat_span * cfg.padding;
    max_lat += lat_span * cfg.padding;

    ViewportBounds {
        lat_range: [min_lat, max_lat],
        lon_range: [vp_min_lon, vp_max_lon],
        center_lat,
        center_lon,
        pixel_height,
    }
}

/// Looks up a per-region table entry, tolerating script-variant
/// spellings of the region name.
fn region_entry<'a, T>(table: &'a HashMap<String, T>, region: Option<&str>) -> Option<&'a T> {
    let region = region?;
    if let Some(entry) = table.get(region) {
        return Some(entry);
    }
    matching::script_variants(region)
        .iter()
        .find_map(|variant| table.get(variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry};

    fn feature_from(value: Value) -> MatchedFeature {
        MatchedFeature {
            feature: Feature {
                bbox: None,
                geometry: Some(Geometry::new(value)),
                id: None,
                properties: None,
                foreign_members: None,
            },
            location_name: "測試區".to_string(),
            resolved_name: "測試區".to_string(),
            case_count: 1,
        }
    }

    fn polygon(coords: &[(f64, f64)]) -> MatchedFeature {
        let ring: Vec<Vec<f64>> = coords.iter().map(|&(lon, lat)| vec![lon, lat]).collect();
        feature_from(Value::Polygon(vec![ring]))
    }

    #[test]
    fn bounds_contain_center_after_padding() {
        let features = vec![polygon(&[
            (120.2, 22.5),
            (120.6, 22.5),
            (120.6, 23.0),
            (120.2, 23.0),
        ])];
        let vp = compute(&features, None, &MapConfig::default());
        assert!(vp.lat_range[0] <= vp.center_lat && vp.center_lat <= vp.lat_range[1]);
        assert!(vp.lon_range[0] <= vp.center_lon && vp.center_lon <= vp.lon_range[1]);
    }

    #[test]
    fn pixel_height_is_clamped() {
        let cfg = MapConfig::default();

        // A tiny region still gets a usable height.
        let small = vec![polygon(&[(120.30, 22.60), (120.31, 22.61)])];
        let vp = compute(&small, None, &cfg);
        assert_eq!(vp.pixel_height, cfg.min_height);

        // A region spanning the whole window is capped.
        let large = vec![polygon(&[(118.5, 20.5), (122.5, 24.5)])];
        let vp = compute(&large, None, &cfg);
        assert_eq!(vp.pixel_height, cfg.max_height);
    }

    #[test]
    fn outlying_coordinates_are_rejected() {
        // One vertex on an outlying island at 26°N must not stretch the
        // bounds northward.
        let features = vec![polygon(&[
            (120.2, 22.5),
            (120.6, 23.0),
            (119.5, 26.0),
        ])];
        let vp = compute(&features, None, &MapConfig::default());
        assert!(vp.lat_range[1] < 24.0, "bounds stretched to {:?}", vp.lat_range);
    }

    #[test]
    fn all_coordinates_rejected_falls_back_to_region_box() {
        let features = vec![polygon(&[(119.5, 26.0), (119.6, 26.1)])];
        let cfg = MapConfig::default();
        let vp = compute(&features, Some("台南市"), &cfg);
        let expected = cfg.fallback_bounds["台南市"];
        let center = (expected[0] + expected[1]) / 2.0 + cfg.recenter["台南市"][1];
        assert!((vp.center_lat - center).abs() < 1e-9);
    }

    #[test]
    fn fallback_box_tolerates_script_variant_region_name() {
        let cfg = MapConfig::default();
        let a = compute(&[], Some("台南市"), &cfg);
        let b = compute(&[], Some("臺南市"), &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_region_uses_default_box() {
        let cfg = MapConfig::default();
        let vp = compute(&[], Some("花蓮縣"), &cfg);
        let mid = (cfg.default_bounds[0] + cfg.default_bounds[1]) / 2.0;
        assert!((vp.center_lat - mid).abs() < 1e-9);
    }

    #[test]
    fn lat_span_floor_applies_to_point_features() {
        let features = vec![feature_from(Value::Point(vec![120.3, 22.6]))];
        let cfg = MapConfig::default();
        let vp = compute(&features, None, &cfg);
        // The floored span feeds the height and the padding margin even
        // though the latitude range itself stays at the raw extent.
        assert_eq!(vp.pixel_height, cfg.min_height);
        let span = vp.lat_range[1] - vp.lat_range[0];
        assert!((span - 2.0 * 0.1 * cfg.padding).abs() < 1e-9);
    }

    #[test]
    fn multipolygon_and_collection_geometries_are_walked() {
        let multi = feature_from(Value::MultiPolygon(vec![
            vec![vec![vec![120.2, 22.5], vec![120.3, 22.6]]],
            vec![vec![vec![120.8, 23.1]]],
        ]));
        let nested = feature_from(Value::GeometryCollection(vec![Geometry::new(
            Value::Polygon(vec![vec![vec![121.0, 23.4]]]),
        )]));
        let vp = compute(&[multi, nested], None, &MapConfig::default());
        assert!(vp.lat_range[0] < 22.5 && vp.lat_range[1] > 23.4);
    }

    #[test]
    fn aspect_ratio_drives_longitude_span() {
        let cfg = MapConfig::default();
        let features = vec![polygon(&[(120.0, 22.0), (120.1, 23.0)])];
        let vp = compute(&features, None, &cfg);
        let lat_span: f64 = 1.0;
        let expected_height = (lat_span * cfg.pixels_per_degree)
            .clamp(cfg.min_height, cfg.max_height);
        let expected_lon_span =
            lat_span * (cfg.container_width / expected_height) * (1.0 + 2.0 * cfg.padding);
        let lon_span = vp.lon_range[1] - vp.lon_range[0];
        assert!((lon_span - expected_lon_span).abs() < 1e-9);
    }
}
