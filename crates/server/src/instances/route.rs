//! GET /instances/* — stacked chart, per-service drill-down, current state.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::instances::aggregate::{
    current_tenants, group_by_label, group_by_pod_prefix, group_services,
};
use crate::instances::model::{GraphRange, Series, TenantCurrent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DrilldownQuery {
    pub namespace: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub series: Vec<Series>,
    pub range: &'static str,
    pub step: u32,
}

#[derive(Debug, Serialize)]
pub struct DrilldownResponse {
    pub series: Vec<Series>,
}

#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    pub tenants: Vec<TenantCurrent>,
}

pub async fn graph_handler(
    State(state): State<AppState>,
    Query(params): Query<GraphQuery>,
) -> Result<Json<GraphResponse>, ApiError> {
    let range = parse_range(params.range.as_deref())?;
    let now = Utc::now();
    let start = now - range.duration();

    let queries = &state.config.queries;
    let raw = state
        .metrics
        .query_range(&queries.instances, start, now, range.step_secs())
        .await;

    Ok(Json(GraphResponse {
        series: group_by_label(raw, &queries.tenant_label),
        range: range.as_str(),
        step: range.step_secs(),
    }))
}

pub async fn drilldown_handler(
    State(state): State<AppState>,
    Query(params): Query<DrilldownQuery>,
) -> Result<Json<DrilldownResponse>, ApiError> {
    let namespace = params
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("namespace is required".to_string()))?;

    // The namespace is interpolated into a backend query; restrict it to
    // plain identifier characters.
    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ApiError::InvalidRequest(
            "namespace contains invalid characters".to_string(),
        ));
    }

    let range = parse_range(params.range.as_deref())?;
    let now = Utc::now();
    let start = now - range.duration();

    let queries = &state.config.queries;
    let query = queries.drilldown.replace("$namespace", namespace);
    let raw = state
        .metrics
        .query_range(&query, start, now, range.step_secs())
        .await;

    let mut series = group_services(raw, &queries.service_label);
    if series.is_empty() {
        // Nothing carries the service label (older clusters): fall back to
        // raw per-pod series keyed by pod-name prefix.
        let pods_query = queries.drilldown_pods.replace("$namespace", namespace);
        let raw = state
            .metrics
            .query_range(&pods_query, start, now, range.step_secs())
            .await;
        series = group_by_pod_prefix(raw, &queries.pod_label);
    }

    Ok(Json(DrilldownResponse { series }))
}

pub async fn current_handler(
    State(state): State<AppState>,
) -> Result<Json<CurrentResponse>, ApiError> {
    let queries = &state.config.queries;
    let (counts, pods) = tokio::join!(
        state.metrics.query_instant(&queries.current),
        state.metrics.query_instant(&queries.pods),
    );

    Ok(Json(CurrentResponse {
        tenants: current_tenants(counts, pods, &queries.tenant_label, &queries.pod_label),
    }))
}

fn parse_range(range: Option<&str>) -> Result<GraphRange, ApiError> {
    let raw = range.unwrap_or("24h");
    raw.parse()
        .map_err(|_| ApiError::InvalidRequest(format!("unknown range '{raw}'")))
}
