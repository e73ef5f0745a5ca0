// Per-Diem Dashboard - Web Server
// REST API with Axum over the immutable canonical table

use anyhow::Context;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use diarias_dashboard::config::{init_logging, ServerSettings};
use diarias_dashboard::{
    load_or_empty, query, EntityFilter, LoadStats, MonthRange, Table, ALL_ENTITIES,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Published once before serving, never mutated
    table: Arc<Table>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Query string of GET /api/dashboard
#[derive(Debug, Deserialize)]
struct DashboardParams {
    entity: Option<String>,
    min_month: Option<u32>,
    max_month: Option<u32>,
}

/// Load report response
#[derive(Serialize)]
struct LoadReportResponse {
    source: Option<String>,
    records: usize,
    stats: LoadStats,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/entities - Sorted entity names for the selector
async fn get_entities(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.table.entities()))
}

/// GET /api/dashboard - Dashboard view for one filter state
async fn get_dashboard(
    State(state): State<AppState>,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> impl IntoResponse {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            warn!("Rejected dashboard query: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(rejection.body_text())),
            )
                .into_response();
        }
    };

    let months = match MonthRange::new(
        params.min_month.unwrap_or(1),
        params.max_month.unwrap_or(12),
    ) {
        Ok(months) => months,
        Err(e) => {
            warn!("Rejected dashboard query: {}", e);
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())))
                .into_response();
        }
    };

    let entity = EntityFilter::parse(params.entity.as_deref().unwrap_or(ALL_ENTITIES));
    let view = query(&state.table, &entity, months);

    (StatusCode::OK, Json(ApiResponse::ok(view))).into_response()
}

/// GET /api/load-report - What the loader kept, skipped and coerced
async fn get_load_report(State(state): State<AppState>) -> impl IntoResponse {
    let table = &state.table;
    Json(ApiResponse::ok(LoadReportResponse {
        source: table.source().map(|p| p.display().to_string()),
        records: table.len(),
        stats: table.stats().clone(),
    }))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entities", get(get_entities))
        .route("/dashboard", get(get_dashboard))
        .route("/load-report", get(get_load_report))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::parse();
    init_logging(&settings.common.log_level)?;

    // A failed load still serves an empty dashboard
    let table = Arc::new(load_or_empty(&settings.common.data_file));
    info!(records = table.len(), "Canonical table ready");

    let app = build_router(AppState { table });

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;

    info!("Server running on http://{}", settings.bind);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
