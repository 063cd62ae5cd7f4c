use crate::config::AppConfig;
use crate::data::{self, Dataset};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// URL slugs and legacy spellings accepted by the per-county endpoint.
const COUNTY_ALIASES: &[(&str, &str)] = &[
    ("kaohsiung", "高雄市"),
    ("tainan", "台南市"),
    ("臺南市", "台南市"),
    ("臺北市", "台北市"),
];

pub struct AppState {
    pub dataset: Dataset,
    pub config: AppConfig,
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);

    let site_service = ServeDir::new(&config.output.site_dir);
    let state = Arc::new(AppState { dataset, config });

    let app = Router::new()
        .route("/api/data", get(data_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/data/:county", get(county_handler))
        .nest_service("/", site_service)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn data_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.dataset.raw.clone())
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.dataset.raw.get("summary") {
        Some(summary) => Ok(Json(summary.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "分析資料缺少摘要"})),
        )),
    }
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    Path(county): Path<String>,
) -> Json<Value> {
    let county_name = resolve_alias(&county);
    println!("County request: {} -> {}", county, county_name);
    Json(data::county_slice(&state.dataset, county_name))
}

fn resolve_alias(county: &str) -> &str {
    COUNTY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == county)
        .map(|(_, name)| *name)
        .unwrap_or(county)
}
