//! GET /events — the event feed.
//!
//! `?since=` selects live-poll mode, `?before=` (or neither parameter)
//! selects backfill mode. The two are mutually exclusive.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::events::model::PlatformEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub since: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<PlatformEvent>,
    pub latest_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<i64>,
    pub has_more: bool,
}

pub async fn events_handler(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    if params.since.is_some() && params.before.is_some() {
        return Err(ApiError::InvalidRequest(
            "since and before are mutually exclusive".to_string(),
        ));
    }

    let aggregator = state.event_aggregator();
    let now = Utc::now();

    let page = match &params.since {
        Some(since) => {
            let since = parse_cursor("since", since)?;
            aggregator.live(since, now).await
        }
        None => {
            let before = params
                .before
                .as_deref()
                .map(|b| parse_cursor("before", b))
                .transpose()?;
            aggregator.backfill(before, now).await
        }
    };

    Ok(Json(EventsResponse {
        events: page.events,
        latest_timestamp: page.latest_timestamp,
        oldest_timestamp: page.oldest_timestamp,
        has_more: page.has_more,
    }))
}

fn parse_cursor(name: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ApiError::InvalidRequest(format!("{name} must be an ISO-8601 timestamp")))
}
