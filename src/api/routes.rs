use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{AnalyticsResult, AnalyzeOptions, ListingValuation};
use crate::config::MAX_HISTORY_WINDOW_DAYS;
use crate::db::HistoryQuery;
use crate::engine::Engine;
use crate::error::AppError;
use crate::estimator::estimate;
use crate::types::{Condition, FingerprintKey, HistoricalPoint, InventoryRecord, RecordStatus, ValueEstimate};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Engine>,
    pub top_deals_limit: usize,
    /// Default trend window for /analytics and model history (0 = unbounded).
    pub history_window_days: i64,
}

/// Read-only surface for the presentation layer. Nothing here takes the pass lock.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/inventory", get(get_inventory))
        .route("/inventory/:fingerprint/history", get(get_fingerprint_history))
        .route("/models/:manufacturer/:model/history", get(get_model_history))
        .route("/analytics", get(get_analytics))
        .route("/deals", get(get_deals))
        .route("/estimate", get(get_estimate))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct InventoryQuery {
    /// active (default), delisted or all
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct WindowQuery {
    /// Overrides the configured history window. 0 = all history.
    pub days: Option<i64>,
    pub top_n: Option<usize>,
}

#[derive(Deserialize)]
pub struct DealsQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct EstimateQuery {
    pub manufacturer: String,
    pub model: String,
    #[serde(default)]
    pub caliber: String,
    pub condition: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_ok: bool,
    pub last_pass_at_ns: u64,
    pub passes_ok: u64,
    pub passes_failed: u64,
    pub last_pass_listings: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub passes: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

#[derive(Serialize)]
pub struct ModelHistoryResponse {
    pub manufacturer: String,
    pub model: String,
    pub points: Vec<HistoricalPoint>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `None` means every status.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<RecordStatus>, AppError> {
    match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
        None | Some("") | Some("ACTIVE") => Ok(Some(RecordStatus::Active)),
        Some("ALL") => Ok(None),
        Some(other) => RecordStatus::parse(other)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status {other:?}"))),
    }
}

fn window_options(state: &ApiState, days: Option<i64>, top_n: Option<usize>) -> Result<AnalyzeOptions, AppError> {
    let days = days.unwrap_or(state.history_window_days);
    let out_of_range = || AppError::BadRequest(format!("days must be between 0 and {MAX_HISTORY_WINDOW_DAYS}"));
    if !(0..=MAX_HISTORY_WINDOW_DAYS).contains(&days) {
        return Err(out_of_range());
    }
    let since = match days {
        0 => None,
        d => {
            let span = TimeDelta::try_days(d).ok_or_else(out_of_range)?;
            Some(Utc::now().checked_sub_signed(span).ok_or_else(out_of_range)?)
        }
    };
    Ok(AnalyzeOptions {
        top_n: top_n.unwrap_or(state.top_deals_limit),
        since,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_inventory(
    State(state): State<ApiState>,
    Query(params): Query<InventoryQuery>,
) -> Result<Json<Vec<InventoryRecord>>, AppError> {
    let status = parse_status_filter(params.status.as_deref())?;
    Ok(Json(state.engine.inventory(status).await?))
}

async fn get_fingerprint_history(
    State(state): State<ApiState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<Vec<HistoricalPoint>>, AppError> {
    let key: FingerprintKey = fingerprint
        .parse()
        .map_err(|_| AppError::BadRequest(format!("malformed fingerprint {fingerprint:?}")))?;
    let points = state.engine.history(&HistoryQuery::Fingerprint(key)).await?;
    // Every stored fingerprint has at least its first-sighting point.
    if points.is_empty() {
        return Err(AppError::NotFound(format!("no history for {fingerprint}")));
    }
    Ok(Json(points))
}

async fn get_model_history(
    State(state): State<ApiState>,
    Path((manufacturer, model)): Path<(String, String)>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<ModelHistoryResponse>, AppError> {
    let since = window_options(&state, params.days, None)?.since;
    let points = state
        .engine
        .history(&HistoryQuery::Model {
            manufacturer: manufacturer.clone(),
            model: model.clone(),
        })
        .await?
        .into_iter()
        .filter(|p| since.map_or(true, |cutoff| p.timestamp >= cutoff))
        .collect();
    Ok(Json(ModelHistoryResponse {
        manufacturer,
        model,
        points,
    }))
}

async fn get_analytics(
    State(state): State<ApiState>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<AnalyticsResult>, AppError> {
    let opts = window_options(&state, params.days, params.top_n)?;
    Ok(Json(state.engine.analytics(&opts).await?))
}

async fn get_deals(
    State(state): State<ApiState>,
    Query(params): Query<DealsQuery>,
) -> Result<Json<Vec<ListingValuation>>, AppError> {
    let opts = AnalyzeOptions {
        top_n: params.limit.unwrap_or(state.top_deals_limit),
        since: None,
    };
    Ok(Json(state.engine.analytics(&opts).await?.top_deals))
}

async fn get_estimate(Query(params): Query<EstimateQuery>) -> Json<ValueEstimate> {
    let condition = params.condition.as_deref().map(Condition::parse).unwrap_or_default();
    Json(estimate(&params.manufacturer, &params.model, &params.caliber, condition))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = state.engine.health();
    Json(HealthResponse {
        status: if h.storage_ok() { "ok" } else { "degraded" },
        storage_ok: h.storage_ok(),
        last_pass_at_ns: h.last_pass_at_ns(),
        passes_ok: h.passes_ok(),
        passes_failed: h.passes_failed(),
        last_pass_listings: h.last_pass_listings(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let stats = state.engine.latency();
    let ms = |us: u64| us as f64 / 1_000.0;
    let p = stats.percentiles();
    Json(LatencyResponse {
        passes: stats.len(),
        p50_ms: p.map(|(p50, _, _, _)| ms(p50)),
        p95_ms: p.map(|(_, p95, _, _)| ms(p95)),
        p99_ms: p.map(|(_, _, p99, _)| ms(p99)),
        max_ms: p.map(|(_, _, _, max)| ms(max)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_defaults_to_active() {
        assert_eq!(parse_status_filter(None).unwrap(), Some(RecordStatus::Active));
        assert_eq!(parse_status_filter(Some("delisted")).unwrap(), Some(RecordStatus::Delisted));
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
        assert!(parse_status_filter(Some("sold")).is_err());
    }

    fn state() -> ApiState {
        ApiState {
            engine: Arc::new(Engine::new(Arc::new(crate::db::MemoryStorage::new()))),
            top_deals_limit: 10,
            history_window_days: 90,
        }
    }

    #[test]
    fn window_days_out_of_range_is_bad_request() {
        let state = state();
        for days in [-1, MAX_HISTORY_WINDOW_DAYS + 1, 1_000_000_000_000, i64::MAX] {
            let err = window_options(&state, Some(days), None).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "days={days}");
        }
    }

    #[test]
    fn window_days_defaults_and_zero() {
        let state = state();
        let opts = window_options(&state, None, Some(3)).unwrap();
        assert_eq!(opts.top_n, 3);
        let cutoff = opts.since.unwrap();
        let age = Utc::now() - cutoff;
        assert!(age >= TimeDelta::days(90) && age < TimeDelta::days(91));

        assert!(window_options(&state, Some(0), None).unwrap().since.is_none());
        assert!(window_options(&state, Some(MAX_HISTORY_WINDOW_DAYS), None).unwrap().since.is_some());
    }
}
