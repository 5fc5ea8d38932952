//! Mock analysis routes.
//!
//! POST /analysis/disease     - Canned disease report for a leaf image
//! GET  /insights/sensor-data - Latest sensor reading (backend or fallback)
//! GET  /insights/alerts      - Active sensor alerts (backend or none)
//! GET  /insights/predictions - Sensor predictions (backend or fallback)
//! GET  /insights/trends      - Sensor trends over `days` (default 7)
//! GET  /insights/history     - Recent readings, up to `limit` (default 100)

use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::analysis::disease::{self, DiseaseReport};
use crate::analysis::sensor::{self, Insight, Source};
use crate::error::{AppError, Result};
use crate::extract::AppJson;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Build the insights router.
pub fn router() -> Router {
    Router::new()
        .route("/analysis/disease", post(detect_disease))
        .route("/insights/sensor-data", get(sensor_data))
        .route("/insights/alerts", get(alerts))
        .route("/insights/predictions", get(predictions))
        .route("/insights/trends", get(trends))
        .route("/insights/history", get(history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiseaseRequest {
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct TrendsQuery {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    7
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

fn insight_response(insight: Insight) -> Json<ApiResponse<Insight>> {
    let message = match insight.source {
        Source::Backend => "Served by prediction backend",
        Source::Fallback => "Prediction backend unavailable, serving fallback data",
    };
    Json(ApiResponse::new(insight, message))
}

async fn detect_disease(
    AppJson(req): AppJson<DiseaseRequest>,
) -> Result<Json<ApiResponse<DiseaseReport>>> {
    if req.image_url.trim().is_empty() {
        return Err(AppError::Validation("imageUrl is required".to_string()));
    }
    let report = disease::detect(&mut rand::thread_rng(), req.image_url);
    Ok(Json(ApiResponse::new(report, "Analysis complete")))
}

async fn sensor_data(Extension(state): Extension<AppState>) -> Json<ApiResponse<Insight>> {
    let now = state.clock.now();
    let insight = sensor::fetch_or_fallback(
        &state.http,
        &state.config,
        "/api/data",
        &[],
        || sensor::fallback_reading(now),
    )
    .await;
    insight_response(insight)
}

async fn alerts(Extension(state): Extension<AppState>) -> Json<ApiResponse<Insight>> {
    let insight = sensor::fetch_or_fallback(
        &state.http,
        &state.config,
        "/api/alerts",
        &[],
        sensor::fallback_alerts,
    )
    .await;
    insight_response(insight)
}

async fn predictions(Extension(state): Extension<AppState>) -> Json<ApiResponse<Insight>> {
    let insight = sensor::fetch_or_fallback(
        &state.http,
        &state.config,
        "/api/predictions",
        &[],
        sensor::fallback_predictions,
    )
    .await;
    insight_response(insight)
}

async fn trends(
    Extension(state): Extension<AppState>,
    Query(q): Query<TrendsQuery>,
) -> Json<ApiResponse<Insight>> {
    let insight = sensor::fetch_or_fallback(
        &state.http,
        &state.config,
        "/api/trends",
        &[("days", q.days.to_string())],
        || sensor::fallback_trends(q.days),
    )
    .await;
    insight_response(insight)
}

async fn history(
    Extension(state): Extension<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<ApiResponse<Insight>> {
    let now = state.clock.now();
    let insight = sensor::fetch_or_fallback(
        &state.http,
        &state.config,
        "/api/historical",
        &[("limit", q.limit.to_string())],
        || sensor::fallback_history(q.limit, now),
    )
    .await;
    insight_response(insight)
}
