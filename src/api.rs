//! HTTP API handlers for Airwatch.
//!
//! These handlers expose the engine's queries and configuration calls to the
//! UI collaborator. They are thin: every decision is made by the engine, and
//! handlers only translate between JSON and engine calls.
//!
//! Engine errors map onto status codes:
//!
//! - `InvalidPeriod`, `InvalidVectorLength`, `InvalidThreshold`,
//!   `SeriesLengthMismatch` -> `400 Bad Request`
//! - `RuleNotFound`, `NotificationNotFound` -> `404 Not Found`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::advisory;
use crate::engine::{LocationStatus, Monitor};
use crate::error::EngineError;
use crate::model::{
    Advisory, AlertRule, AlertRuleRequest, HourlySeries, Notification, PeriodComparison,
    PollutantDelta, QuestionnaireAnswer, TrendPeriod, TrendSeries,
};
use crate::trends::{compare_to_previous, snapshot_comparison};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Mutex<Monitor>>,
}

impl AppState {
    pub fn new(monitor: Monitor) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
        }
    }
}

/// JSON body returned with every error status.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(err: EngineError) -> ApiError {
    let status = match err {
        EngineError::RuleNotFound(_) | EngineError::NotificationNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::InvalidPeriod(_)
        | EngineError::InvalidVectorLength { .. }
        | EngineError::InvalidThreshold(_)
        | EngineError::SeriesLengthMismatch { .. } => StatusCode::BAD_REQUEST,
    };

    warn!(status = %status, error = %err, "Request rejected");

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Build the router with every endpoint mounted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/current", get(get_current))
        .route("/current/history", get(get_history))
        .route("/alerts/rules", get(get_rules))
        .route("/alerts/rules/:id", put(put_rule).delete(delete_rule))
        .route("/notifications", get(get_notifications))
        .route("/notifications/:id/ack", post(acknowledge_notification))
        .route("/recommendations", post(post_recommendations))
        .route("/trends/compare", post(post_compare))
        .route("/trends/snapshot", post(post_snapshot))
        .route("/trends/:period", get(get_trend).put(put_trend))
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /current - Latest measurement, band and generic tips per location.
#[instrument(skip(state))]
pub async fn get_current(State(state): State<AppState>) -> Json<Vec<LocationStatus>> {
    let monitor = state.monitor.lock().await;
    Json(monitor.current())
}

/// GET /current/history - Hourly AQI averages over the last 24 hours per location.
#[instrument(skip(state))]
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HourlySeries>> {
    let monitor = state.monitor.lock().await;
    Json(monitor.history())
}

/// GET /alerts/rules - All configured alert rules.
#[instrument(skip(state))]
pub async fn get_rules(State(state): State<AppState>) -> Json<Vec<AlertRule>> {
    let monitor = state.monitor.lock().await;
    Json(monitor.rules())
}

/// PUT /alerts/rules/:id - Create or replace an alert rule.
///
/// # Request Body
///
/// ```json
/// {
///     "location_scope": "Downtown",
///     "threshold": 100,
///     "frequency_mode": "hourly",
///     "channel": "email",
///     "enabled": true
/// }
/// ```
///
/// Only `threshold` is required. Thresholds outside 0-200 are rejected.
#[instrument(skip(state, request))]
pub async fn put_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AlertRuleRequest>,
) -> Result<Json<AlertRule>, ApiError> {
    let rule = request.into_rule(id);
    let mut monitor = state.monitor.lock().await;

    monitor.upsert_rule(rule.clone()).map_err(reject)?;
    Ok(Json(rule))
}

/// DELETE /alerts/rules/:id - Remove a rule and its runtime state.
#[instrument(skip(state))]
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut monitor = state.monitor.lock().await;

    monitor.remove_rule(&id).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /notifications - Unacknowledged notifications, newest first.
#[instrument(skip(state))]
pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    let monitor = state.monitor.lock().await;
    let notifications = monitor.active_notifications(Utc::now());

    info!(count = notifications.len(), "Notifications queried");
    Json(notifications)
}

/// POST /notifications/:id/ack - Acknowledge a notification.
#[instrument(skip(state))]
pub async fn acknowledge_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let mut monitor = state.monitor.lock().await;
    monitor.acknowledge(id).map(Json).map_err(reject)
}

/// POST /recommendations - Resolve a questionnaire into advisory bundles.
///
/// # Request Body
///
/// ```json
/// {
///     "activity": "Athletic Training",
///     "sensitivity": "Severe",
///     "location_type": "Industrial Zone"
/// }
/// ```
///
/// Missing fields yield `{"status": "incomplete", ...}` rather than an error.
#[instrument]
pub async fn post_recommendations(Json(answers): Json<QuestionnaireAnswer>) -> Json<Advisory> {
    let advisory = advisory::resolve(&answers);

    match &advisory {
        Advisory::Ready { bundles } => info!(bundles = bundles.len(), "Recommendations resolved"),
        Advisory::Incomplete { answered, .. } => {
            info!(answered, "Questionnaire incomplete")
        }
    }

    Json(advisory)
}

/// GET /trends/:period - Series for `weekly`, `monthly` or `yearly`.
#[instrument(skip(state))]
pub async fn get_trend(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Json<TrendSeries>, ApiError> {
    let monitor = state.monitor.lock().await;
    monitor.trends().get_series(&period).map(Json).map_err(reject)
}

/// Body for replacing a trend series.
#[derive(Debug, Deserialize)]
pub struct TrendUpdate {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// PUT /trends/:period - Replace a series with externally supplied history.
#[instrument(skip(state, update))]
pub async fn put_trend(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Json(update): Json<TrendUpdate>,
) -> Result<Json<TrendSeries>, ApiError> {
    let period: TrendPeriod = period.parse().map_err(reject)?;
    let mut monitor = state.monitor.lock().await;

    monitor
        .trends_mut()
        .reconfigure(period, update.labels, update.values)
        .map_err(reject)?;
    Ok(Json(monitor.trends().series(period).clone()))
}

/// Body for the comparison endpoints.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub current: Vec<f64>,
    pub previous: Vec<f64>,
}

/// POST /trends/compare - Percentage change between two periods.
#[instrument(skip(request))]
pub async fn post_compare(Json(request): Json<CompareRequest>) -> Json<PeriodComparison> {
    Json(compare_to_previous(&request.current, &request.previous))
}

/// POST /trends/snapshot - Per-pollutant deltas between two six-axis vectors.
#[instrument(skip(request))]
pub async fn post_snapshot(
    Json(request): Json<CompareRequest>,
) -> Result<Json<Vec<PollutantDelta>>, ApiError> {
    snapshot_comparison(&request.current, &request.previous)
        .map(|deltas| Json(deltas.to_vec()))
        .map_err(reject)
}
