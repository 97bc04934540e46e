//! vippulse API Server: serves persisted reconciliation results to the dashboard.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use vippulse_core::{Settings, telemetry};
use vippulse_recon::{Chain, DiscountStatus};
use vippulse_storage as storage;

/// Shared application state.
struct AppState {
    pool: storage::PgPool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    telemetry::init();
    let settings = Settings::from_env()?;

    tracing::info!("Starting vippulse API Server");

    let database_url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| eyre::eyre!("DATABASE_URL must be set for the API server"))?;

    let pool = storage::connect(database_url).await?;
    storage::migrate(&pool).await?;

    tracing::info!("Database ready");

    let state = Arc::new(AppState { pool });

    let app = Router::new()
        .route("/api/v1/purchases", get(list_purchases))
        .route("/api/v1/exceptions", get(list_exceptions))
        .route("/api/v1/summary/daily", get(daily_summary))
        .route("/api/v1/summary/denominations", get(denomination_summary))
        .route("/api/v1/runs/latest", get(latest_run))
        .route("/health", get(health))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.api_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ─── Query Params ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PurchaseParams {
    status: Option<String>,
    chain: Option<String>,
    limit: Option<i64>,
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

type ApiError = (StatusCode, Json<ApiResponse<String>>);

fn json_ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

fn json_err(status: StatusCode, msg: &str) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: msg.to_string(),
        }),
    )
}

fn db_err(e: sqlx::Error) -> ApiError {
    tracing::error!(error = %e, "Query failed");
    json_err(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

/// Canonicalise the `status` and `chain` filters, rejecting unknown values.
fn parse_filters(params: &PurchaseParams) -> Result<(Option<String>, Option<String>), ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<DiscountStatus>().map(|s| s.to_string()))
        .transpose()
        .map_err(|e| json_err(StatusCode::BAD_REQUEST, &e))?;
    let chain = params
        .chain
        .as_deref()
        .map(|c| c.parse::<Chain>().map(|c| c.to_string()))
        .transpose()
        .map_err(|e| json_err(StatusCode::BAD_REQUEST, &e))?;
    Ok((status, chain))
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// GET /api/v1/purchases: classified purchases, filterable by status and chain.
async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PurchaseParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (status, chain) = parse_filters(&params)?;
    let limit = params.limit.unwrap_or(500).clamp(1, 10_000);
    let rows = storage::repos::get_purchases(&state.pool, status.as_deref(), chain.as_deref(), limit)
        .await
        .map_err(db_err)?;
    Ok(json_ok(rows))
}

/// GET /api/v1/exceptions: eligible holders who did not get the discount.
async fn list_exceptions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = storage::repos::get_exceptions(&state.pool)
        .await
        .map_err(db_err)?;
    Ok(json_ok(rows))
}

/// GET /api/v1/summary/daily: totals per day and chain.
async fn daily_summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = storage::repos::get_daily_summary(&state.pool)
        .await
        .map_err(db_err)?;
    Ok(json_ok(rows))
}

/// GET /api/v1/summary/denominations: averages per card face value.
async fn denomination_summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = storage::repos::get_denomination_summary(&state.pool)
        .await
        .map_err(db_err)?;
    Ok(json_ok(rows))
}

/// GET /api/v1/runs/latest: metadata of the last pass, including the partial flag.
async fn latest_run(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let run = storage::repos::get_latest_run(&state.pool)
        .await
        .map_err(db_err)?;
    match run {
        Some(run) => Ok(json_ok(run)),
        None => Err(json_err(StatusCode::NOT_FOUND, "No analysis has run yet")),
    }
}
