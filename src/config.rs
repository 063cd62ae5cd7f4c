use std::collections::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub analysis_json: PathBuf,
    /// Candidate county-level boundary files, tried in order; the first
    /// non-empty FeatureCollection wins.
    pub county_boundaries: Vec<PathBuf>,
    /// Candidate township-level boundary files, same fallback rule.
    pub township_boundaries: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Coordinates outside this window are ignored when computing map
    /// bounds (rejects outlying islands that would distort the view).
    #[serde(default = "default_lat_limits")]
    pub lat_limits: [f64; 2],
    #[serde(default = "default_lon_limits")]
    pub lon_limits: [f64; 2],
    #[serde(default = "default_pixels_per_degree")]
    pub pixels_per_degree: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
    #[serde(default = "default_max_height")]
    pub max_height: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
    /// Assumed pixel width of the map container on the dashboard pages.
    #[serde(default = "default_container_width")]
    pub container_width: f64,
    /// Hand-tuned [lon, lat] recentering offsets per county. Visual
    /// corrections with no derivation; kept as data, not logic.
    #[serde(default = "default_recenter")]
    pub recenter: HashMap<String, [f64; 2]>,
    /// Fallback bounding boxes [min_lat, max_lat, min_lon, max_lon] per
    /// county, used when no coordinate survives the sanity window.
    #[serde(default = "default_fallback_bounds")]
    pub fallback_bounds: HashMap<String, [f64; 4]>,
    /// Fallback for any region without an entry above (whole island).
    #[serde(default = "default_bounds")]
    pub default_bounds: [f64; 4],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            lat_limits: default_lat_limits(),
            lon_limits: default_lon_limits(),
            pixels_per_degree: default_pixels_per_degree(),
            min_height: default_min_height(),
            max_height: default_max_height(),
            padding: default_padding(),
            container_width: default_container_width(),
            recenter: default_recenter(),
            fallback_bounds: default_fallback_bounds(),
            default_bounds: default_bounds(),
        }
    }
}

fn default_lat_limits() -> [f64; 2] {
    [20.0, 25.0]
}

fn default_lon_limits() -> [f64; 2] {
    [118.0, 123.0]
}

fn default_pixels_per_degree() -> f64 {
    800.0
}

fn default_min_height() -> f64 {
    360.0
}

fn default_max_height() -> f64 {
    800.0
}

fn default_padding() -> f64 {
    0.03
}

fn default_container_width() -> f64 {
    1095.0
}

fn default_recenter() -> HashMap<String, [f64; 2]> {
    HashMap::from([("台南市".to_string(), [-0.03, -0.02])])
}

fn default_fallback_bounds() -> HashMap<String, [f64; 4]> {
    HashMap::from([
        ("台南市".to_string(), [22.7, 23.3, 119.9, 120.5]),
        ("高雄市".to_string(), [22.3, 22.9, 120.0, 120.6]),
    ])
}

fn default_bounds() -> [f64; 4] {
    [21.5, 25.5, 119.0, 122.0]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub site_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
