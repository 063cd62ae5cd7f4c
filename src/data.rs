use crate::matching;
use crate::types::CaseIndex;
use anyhow::{anyhow, Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Property keys that may hold a county's own name, probed in order.
pub const COUNTY_NAME_KEYS: &[&str] =
    &["COUNTYNAME", "COUNTY", "name", "縣市", "NAME_2014"];

/// Property keys that may hold a township feature's parent county.
pub const PARENT_COUNTY_KEYS: &[&str] =
    &["COUNTYNAME", "COUNTY", "縣市", "COUNTY_2014", "COUNTYNAME_109"];

/// Property keys that may hold a township's own name, probed in order.
pub const TOWNSHIP_NAME_KEYS: &[&str] = &[
    "TOWNNAME",
    "TOWN",
    "name",
    "鄉鎮",
    "行政區",
    "NAME_2014",
    "TOWNNAME_2014",
    "TOWNNAME_109",
];

/// The pre-aggregated analysis dataset. `raw` is the file as parsed,
/// served back over the API unchanged; `analysis` is the typed view the
/// generator works from. Field names are a contract with the upstream
/// aggregation step and must not be renamed.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub raw: Value,
    pub analysis: AnalysisData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisData {
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub location: Option<LocationSection>,
    #[serde(default)]
    pub person: Option<Value>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Summary {
    #[serde(default)]
    pub total_cases: u64,
    #[serde(default)]
    pub date_range: String,
    #[serde(default)]
    pub years_covered: i64,
    #[serde(default)]
    pub top_county: String,
    #[serde(default)]
    pub top_county_cases: u64,
    #[serde(default)]
    pub peak_year: i64,
    #[serde(default)]
    pub peak_year_cases: u64,
    #[serde(default)]
    pub local_cases: u64,
    #[serde(default)]
    pub imported_cases: u64,
    #[serde(default)]
    pub local_percentage: f64,
    #[serde(default)]
    pub imported_percentage: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationSection {
    #[serde(default)]
    pub county: Vec<CountyCount>,
    #[serde(default)]
    pub county_top20: Vec<CountyCount>,
    #[serde(default)]
    pub township_top30: Vec<TownshipCount>,
    #[serde(default)]
    pub county_yearly: Vec<CountyYearCount>,
    /// Only present in per-county slices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub township: Vec<TownshipCount>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CountyCount {
    #[serde(rename = "居住縣市")]
    pub county: String,
    #[serde(rename = "病例數")]
    pub cases: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TownshipCount {
    #[serde(rename = "居住縣市")]
    pub county: String,
    #[serde(rename = "居住鄉鎮")]
    pub township: String,
    #[serde(rename = "病例數")]
    pub cases: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CountyYearCount {
    #[serde(rename = "居住縣市")]
    pub county: String,
    #[serde(rename = "發病年")]
    pub year: i64,
    #[serde(rename = "病例數")]
    pub cases: u64,
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    println!("Loading analysis dataset from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open analysis dataset: {:?}", path))?;
    let raw: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse analysis dataset: {:?}", path))?;
    if !raw.is_object() {
        return Err(anyhow!("Analysis dataset must be a JSON object"));
    }
    let analysis: AnalysisData = serde_json::from_value(raw.clone())
        .context("Analysis dataset does not match the expected schema")?;

    for (section, present) in [
        ("summary", analysis.summary.is_some()),
        ("time", analysis.time.is_some()),
        ("location", analysis.location.is_some()),
        ("person", analysis.person.is_some()),
    ] {
        if !present {
            tracing::warn!(section, "dataset is missing a top-level section");
        }
    }

    Ok(Dataset { raw, analysis })
}

/// Tries each candidate boundary file in order and returns the first
/// one that parses to a non-empty FeatureCollection. Sources are
/// probed sequentially, not raced; a failed candidate is logged and
/// skipped.
pub fn load_boundaries(paths: &[PathBuf]) -> Result<FeatureCollection> {
    for path in paths {
        match load_feature_collection(path) {
            Ok(collection) if !collection.features.is_empty() => {
                println!(
                    "Loaded {} boundary features from {:?}",
                    collection.features.len(),
                    path
                );
                return Ok(collection);
            }
            Ok(_) => {
                eprintln!("Boundary source {:?} has no features, trying next...", path);
            }
            Err(e) => {
                eprintln!("Could not load {:?}: {:#}, trying next...", path, e);
            }
        }
    }
    Err(anyhow!(
        "No usable boundary source among {} candidates",
        paths.len()
    ))
}

fn load_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open boundary file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(anyhow!("Boundary file must be a FeatureCollection")),
    }
}

/// Finds the first candidate key present on the collection's first
/// feature. Boundary sources disagree on property naming, so the key
/// has to be probed rather than assumed.
pub fn probe_property_key(
    collection: &FeatureCollection,
    candidates: &[&'static str],
) -> Option<&'static str> {
    let props = collection.features.first()?.properties.as_ref()?;
    candidates.iter().copied().find(|key| props.contains_key(*key))
}

/// Reads a feature property as a string, accepting numeric values the
/// way some sources encode region codes.
pub fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.properties.as_ref()?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Case index over county-level records. The unknown sentinel never
/// enters the index.
pub fn county_case_index(location: &LocationSection) -> CaseIndex {
    let mut index = CaseIndex::new();
    for record in &location.county {
        index.insert(&record.county, record.cases);
    }
    index
}

/// Case index over the target county's townships. Records from other
/// counties are excluded up front so a shared district name cannot leak
/// into the page.
pub fn township_case_index(location: &LocationSection, variants: &[String]) -> CaseIndex {
    let rows = if location.township.is_empty() {
        &location.township_top30
    } else {
        &location.township
    };
    let mut index = CaseIndex::new();
    for record in rows {
        if matching::parent_matches(&record.county, variants) {
            index.insert(&record.township, record.cases);
        }
    }
    index
}

/// Builds the per-county API payload: location records filtered to the
/// county (tolerating script-variant spellings of its name), a small
/// county summary, and the island-wide time/person sections passed
/// through unchanged.
pub fn county_slice(dataset: &Dataset, county_name: &str) -> Value {
    let variants = matching::county_variants(county_name);
    let location = dataset.analysis.location.clone().unwrap_or_default();

    // Prefer the spelling that actually occurs in the dataset.
    let resolved = location
        .county
        .iter()
        .map(|record| record.county.as_str())
        .find(|county| variants.iter().any(|v| v == county))
        .unwrap_or(county_name)
        .to_string();

    let county: Vec<&CountyCount> = location
        .county
        .iter()
        .filter(|record| record.county == resolved)
        .collect();
    let mut township: Vec<&TownshipCount> = location
        .township_top30
        .iter()
        .filter(|record| record.county == resolved)
        .collect();
    township.sort_by(|a, b| b.cases.cmp(&a.cases));
    let county_yearly: Vec<&CountyYearCount> = location
        .county_yearly
        .iter()
        .filter(|record| record.county == resolved)
        .collect();

    let total_cases: u64 = county
        .first()
        .map(|record| record.cases)
        .unwrap_or_else(|| township.iter().map(|record| record.cases).sum());

    json!({
        "summary": {
            "縣市": resolved,
            "總病例數": total_cases,
            "鄉鎮數": township.len(),
        },
        "time": dataset.raw.get("time").cloned().unwrap_or(Value::Null),
        "location": {
            "county": &county,
            "township": &township,
            "township_top30": &township,
            "county_yearly": &county_yearly,
        },
        "person": dataset.raw.get("person").cloned().unwrap_or(Value::Null),
        "last_updated": dataset.raw.get("last_updated").cloned().unwrap_or(Value::Null),
    })
}
