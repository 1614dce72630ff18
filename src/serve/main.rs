//! Reference boundary and point-in-polygon server.
//!
//! Serves admin-area boundaries and answers `filterCoordinatesByBoundary`
//! GraphQL requests from a local GeoJSON area catalog.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use areamap::filter::{
    FilterData, FilterVariables, GraphQlError, GraphQlRequest, GraphQlResponse,
};
use areamap::models::AdminLevel;
use areamap::pip::AreaCatalog;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Admin-area boundary and point-in-polygon server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// GeoJSON FeatureCollection of areas with `level` and `parent` properties
    #[arg(long)]
    areas: std::path::PathBuf,
}

struct AppState {
    catalog: AreaCatalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    info!("Areamap Boundary Server");
    info!("Loading areas from {}", args.areas.display());
    let catalog = AreaCatalog::load_from_file(&args.areas)?;
    if catalog.is_empty() {
        anyhow::bail!("No usable areas in {}", args.areas.display());
    }

    let state = Arc::new(AppState { catalog });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/admin-areas", get(areas_handler))
        .route("/api/admin-areas/children/{parent}", get(children_handler))
        .route("/api/admin-areas/at", get(lookup_handler))
        .route("/query", post(graphql_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    areas: usize,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        areas: state.catalog.len(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AreasParams {
    admin_level: u8,
    #[serde(default)]
    tolerance: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenParams {
    child_level: u8,
    #[serde(default)]
    tolerance: f64,
}

/// Top-level boundaries
async fn areas_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AreasParams>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let level = parse_level(params.admin_level)?;
    if !level.is_top() {
        return Err((
            StatusCode::BAD_REQUEST,
            "levels below 0 are served under /children/{parent}".to_string(),
        ));
    }
    let tolerance = parse_tolerance(params.tolerance)?;
    Ok(Json(state.catalog.boundaries(level, None, tolerance).to_geojson()))
}

/// Children of one area
async fn children_handler(
    State(state): State<Arc<AppState>>,
    Path(parent): Path<String>,
    Query(params): Query<ChildrenParams>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let level = parse_level(params.child_level)?;
    if level.is_top() {
        return Err((StatusCode::BAD_REQUEST, "level 0 has no parent".to_string()));
    }
    let tolerance = parse_tolerance(params.tolerance)?;
    if state.catalog.get(&parent).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("unknown area {parent}")));
    }
    Ok(Json(
        state
            .catalog
            .boundaries(level, Some(&parent), tolerance)
            .to_geojson(),
    ))
}

#[derive(Deserialize)]
struct LookupParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct LookupEntry {
    code: String,
    name: String,
    level: u8,
}

/// Areas containing a point, coarsest first
async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Json<Vec<LookupEntry>> {
    let mut areas = state.catalog.lookup(params.lon, params.lat);
    areas.sort_by_key(|a| a.level);
    Json(
        areas
            .iter()
            .map(|a| LookupEntry {
                code: a.feature.code.clone(),
                name: a.feature.name.clone(),
                level: a.level.get(),
            })
            .collect(),
    )
}

/// Answers the `filterCoordinatesByBoundary` query
async fn graphql_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GraphQlRequest<FilterVariables>>,
) -> Json<GraphQlResponse<FilterData>> {
    if !request.query.contains("filterCoordinatesByBoundary") {
        warn!("Unsupported GraphQL operation");
        return Json(graphql_error("only filterCoordinatesByBoundary is supported"));
    }

    let vars = request.variables;
    match state.catalog.filter(&vars.coordinates, &vars.boundary_id) {
        Some(inside) => {
            info!(
                "{} of {} coordinates inside {}",
                inside.len(),
                vars.coordinates.len(),
                vars.boundary_id
            );
            Json(GraphQlResponse {
                data: Some(FilterData {
                    filter_coordinates_by_boundary: inside,
                }),
                errors: Vec::new(),
            })
        }
        None => Json(graphql_error(&format!(
            "boundary {} not found",
            vars.boundary_id
        ))),
    }
}

fn graphql_error(message: &str) -> GraphQlResponse<FilterData> {
    GraphQlResponse {
        data: None,
        errors: vec![GraphQlError {
            message: message.to_string(),
        }],
    }
}

fn parse_level(level: u8) -> Result<AdminLevel, (StatusCode, String)> {
    AdminLevel::new(level).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("admin level {level} is out of range"),
        )
    })
}

fn parse_tolerance(tolerance: f64) -> Result<f64, (StatusCode, String)> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(tolerance)
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!("invalid tolerance {tolerance}"),
        ))
    }
}
