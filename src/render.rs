use crate::config::AppConfig;
use crate::data::{self, Dataset, LocationSection};
use crate::matching;
use crate::types::{CaseIndex, MatchedFeature, ViewportBounds, UNKNOWN_REGION};
use crate::viewport;
use anyhow::{anyhow, Context, Result};
use geojson::FeatureCollection;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Shared blue ramp for all choropleth panels.
const COLORSCALE: &[(f64, &str)] = &[
    (0.0, "#e0f2fe"),
    (0.2, "#7dd3fc"),
    (0.4, "#38bdf8"),
    (0.6, "#0284c7"),
    (0.8, "#0369a1"),
    (1.0, "#075985"),
];

/// Counties that get their own township-level dashboard page.
const COUNTY_PAGES: &[(&str, &str)] = &[("高雄市", "kaohsiung"), ("台南市", "tainan")];

/// Writes every dashboard artifact under `site_dir/data`. Panels render
/// independently: a failure in one becomes an inline placeholder file
/// and must not block the others.
pub fn generate_site(config: &AppConfig, dataset: &Dataset) -> Result<()> {
    let data_dir = config.output.site_dir.join("data");
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", data_dir))?;

    write_panel(&data_dir, "summary.json", build_summary(dataset));

    match dataset.analysis.location.as_ref() {
        Some(location) => {
            write_panel(&data_dir, "county_table.json", Ok(ranked_county_table(location)));

            write_panel(
                &data_dir,
                "taiwan_map.json",
                build_county_figure(config, location),
            );

            for (county, slug) in COUNTY_PAGES {
                write_panel(
                    &data_dir,
                    &format!("{}_map.json", slug),
                    build_township_figure(config, location, county),
                );
            }
        }
        None => {
            eprintln!("Dataset has no location section, skipping map panels");
        }
    }

    println!("Site data written to {:?}", data_dir);
    Ok(())
}

fn write_panel(dir: &Path, name: &str, figure: Result<Value>) {
    let value = match figure {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Panel {} failed: {:#}", name, e);
            placeholder(&format!("{:#}", e))
        }
    };
    let path = dir.join(name);
    match serde_json::to_string(&value) {
        Ok(body) => {
            if let Err(e) = fs::write(&path, body) {
                eprintln!("Failed to write {:?}: {:#}", path, e);
            }
        }
        Err(e) => eprintln!("Failed to serialize {}: {:#}", name, e),
    }
}

/// Inline message shown in place of a failed panel; the user-facing
/// text stays generic and points at the tabular fallback.
fn placeholder(detail: &str) -> Value {
    json!({
        "error": "無法載入地圖資料",
        "hint": "請查看下方統計表格",
        "detail": detail,
    })
}

fn build_summary(dataset: &Dataset) -> Result<Value> {
    let summary = dataset
        .raw
        .get("summary")
        .cloned()
        .ok_or_else(|| anyhow!("dataset has no summary section"))?;
    Ok(json!({
        "summary": summary,
        "last_updated": dataset.raw.get("last_updated").cloned().unwrap_or(Value::Null),
    }))
}

/// Ranked county table rows with share-of-total percentages, excluding
/// the unknown sentinel.
fn ranked_county_table(location: &LocationSection) -> Value {
    let mut rows: Vec<_> = location
        .county
        .iter()
        .filter(|record| record.county != UNKNOWN_REGION)
        .collect();
    rows.sort_by(|a, b| b.cases.cmp(&a.cases));
    let total: u64 = rows.iter().map(|record| record.cases).sum();

    let rows: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let percentage = if total > 0 {
                record.cases as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            json!({
                "排名": i + 1,
                "居住縣市": record.county,
                "病例數": record.cases,
                "百分比": format!("{:.2}", percentage),
            })
        })
        .collect();
    json!({ "rows": rows, "total": total })
}

/// Island-wide county choropleth.
fn build_county_figure(config: &AppConfig, location: &LocationSection) -> Result<Value> {
    let index = data::county_case_index(location);
    if index.is_empty() {
        return Err(anyhow!("no county case records to map"));
    }

    let collection = data::load_boundaries(&config.input.county_boundaries)?;
    let name_key = data::probe_property_key(&collection, data::COUNTY_NAME_KEYS)
        .ok_or_else(|| anyhow!("boundary file has no recognized county name property"))?;
    println!("Using county name property: {}", name_key);

    let matched = match_features(&collection, name_key, &index);
    if matched.is_empty() {
        return Err(anyhow!("no boundary feature carries a county name"));
    }

    let bounds = viewport::compute(&matched, None, &config.map);
    Ok(figure(&matched, name_key, &bounds, index.max_count()))
}

/// Township choropleth for one county page.
fn build_township_figure(
    config: &AppConfig,
    location: &LocationSection,
    county: &str,
) -> Result<Value> {
    let variants = matching::county_variants(county);
    let index = data::township_case_index(location, &variants);
    if index.is_empty() {
        return Err(anyhow!("no township case records for {}", county));
    }

    let collection = data::load_boundaries(&config.input.township_boundaries)?;
    let name_key = data::probe_property_key(&collection, data::TOWNSHIP_NAME_KEYS)
        .ok_or_else(|| anyhow!("boundary file has no recognized township name property"))?;
    let parent_key = data::probe_property_key(&collection, data::PARENT_COUNTY_KEYS);
    println!(
        "Using township name property {} (parent property {:?})",
        name_key, parent_key
    );

    let scoped = filter_by_parent(collection, parent_key, &variants);
    let matched = match_features(&scoped, name_key, &index);
    if matched.is_empty() {
        return Err(anyhow!("no township feature belongs to {}", county));
    }
    println!("{}: {} township features on the map", county, matched.len());

    let bounds = viewport::compute(&matched, Some(county), &config.map);
    Ok(figure(&matched, name_key, &bounds, index.max_count()))
}

/// Drops features whose declared parent county does not denote the
/// target county under any known name variant. Townships elsewhere can
/// share a name with one inside the county; they must never reach the
/// matcher. Without a parent property no filtering is possible and the
/// whole collection is kept.
fn filter_by_parent(
    collection: FeatureCollection,
    parent_key: Option<&str>,
    variants: &[String],
) -> FeatureCollection {
    let Some(parent_key) = parent_key else {
        return collection;
    };
    let features = collection
        .features
        .into_iter()
        .filter(|feature| match data::property_string(feature, parent_key) {
            Some(parent) => matching::parent_matches(&parent, variants),
            None => true,
        })
        .collect();
    FeatureCollection {
        features,
        bbox: collection.bbox,
        foreign_members: collection.foreign_members,
    }
}

/// Resolves every feature against the case index. Features without a
/// name property are dropped; unmatched names are kept with a count of
/// zero so the output has one entry per boundary feature.
fn match_features(
    collection: &FeatureCollection,
    name_key: &str,
    index: &CaseIndex,
) -> Vec<MatchedFeature> {
    let mut matched = Vec::new();
    for feature in &collection.features {
        let Some(raw_name) = data::property_string(feature, name_key) else {
            continue;
        };
        let m = matching::resolve(&raw_name, index);
        if m.case_count == 0 && index.get(&m.resolved_name).is_none() {
            tracing::warn!(region = %raw_name, "no case record matched boundary feature");
        }
        matched.push(MatchedFeature {
            feature: feature.clone(),
            location_name: raw_name,
            resolved_name: m.resolved_name,
            case_count: m.case_count,
        });
    }
    matched
}

/// Assembles the Plotly figure: one choropleth trace over the matched
/// features plus a mercator geo layout using the computed viewport.
fn figure(
    matched: &[MatchedFeature],
    name_key: &str,
    bounds: &ViewportBounds,
    max_cases: u64,
) -> Value {
    let locations: Vec<&str> = matched.iter().map(|m| m.location_name.as_str()).collect();
    let z: Vec<u64> = matched.iter().map(|m| m.case_count).collect();
    let text: Vec<String> = matched
        .iter()
        .map(|m| format!("{}<br>病例數: {} 例", m.resolved_name, m.case_count))
        .collect();
    let features: Vec<Value> = matched
        .iter()
        .map(|m| json!(m.feature))
        .collect();

    let colorscale: Vec<Value> = COLORSCALE
        .iter()
        .map(|(stop, color)| json!([stop, color]))
        .collect();

    json!({
        "data": [{
            "type": "choropleth",
            "geojson": {
                "type": "FeatureCollection",
                "features": features,
            },
            "locations": locations,
            "z": z,
            "text": text,
            "featureidkey": format!("properties.{}", name_key),
            "hovertemplate": "<b>%{text}</b><extra></extra>",
            "colorscale": colorscale,
            "zmin": 0,
            "zmax": max_cases.max(1),
            "marker": { "line": { "color": "white", "width": 1.5 } },
            "colorbar": {
                "title": { "text": "病例數", "font": { "size": 14, "color": "#333" } },
                "tickformat": ",d",
                "len": 0.6,
                "y": 0.5,
                "yanchor": "middle",
                "bgcolor": "rgba(255,255,255,0.9)",
                "bordercolor": "#ccc",
                "borderwidth": 1,
                "thickness": 20,
            },
        }],
        "layout": {
            "geo": {
                "scope": "asia",
                "visible": true,
                "showcountries": false,
                "showframe": false,
                "showcoastlines": false,
                "showlakes": false,
                "showocean": false,
                "showland": false,
                "projection": { "type": "mercator" },
                "bgcolor": "rgba(0,0,0,0)",
                "center": { "lon": bounds.center_lon, "lat": bounds.center_lat },
                "lonaxis": { "range": bounds.lon_range },
                "lataxis": { "range": bounds.lat_range },
            },
            "margin": { "t": 0, "b": 0, "l": 0, "r": 100 },
            "height": bounds.pixel_height,
            "autosize": true,
            "paper_bgcolor": "rgba(0,0,0,0)",
            "plot_bgcolor": "rgba(0,0,0,0)",
        },
    })
}
