//! HTTP client for the log and metric backends.
//!
//! One `reqwest` client is shared for both stores. The typed `fetch_*`
//! methods return `Result` internally; the [`LogStore`]/[`MetricStore`]
//! impls at the bottom apply the degrade-to-empty contract and log the
//! failure, so aggregation never sees a transport error.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::backend::model::{LokiResponse, PromResponse};
use crate::backend::{InstantSample, LogStore, MetricStore, RangeSeries, RawLine};
use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Backend rejected query: status={0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    loki_url: String,
    prometheus_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            http,
            loki_url: config.loki_url.trim_end_matches('/').to_string(),
            prometheus_url: config.prometheus_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(user) = &self.username {
            req = req.basic_auth(user, self.password.as_deref());
        }
        req
    }

    async fn fetch_logs(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RawLine>, BackendError> {
        let url = format!("{}/loki/api/v1/query_range", self.loki_url);
        let start = rfc3339(start);
        let end = rfc3339(end);
        let limit = limit.to_string();
        let response = self
            .get(url)
            .query(&[
                ("query", query),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", limit.as_str()),
                ("direction", "backward"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let body: LokiResponse = response.json().await?;
        if body.status != "success" {
            return Err(BackendError::Rejected(body.status));
        }

        let mut lines = Vec::new();
        for stream in body.data.result {
            for (ts, line) in stream.values {
                // Timestamps outside i64 range are backend corruption; skip.
                let Ok(timestamp_nanos) = ts.parse::<i64>() else {
                    continue;
                };
                lines.push(RawLine {
                    timestamp_nanos,
                    line,
                });
            }
        }
        Ok(lines)
    }

    async fn fetch_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_secs: u32,
    ) -> Result<Vec<RangeSeries>, BackendError> {
        let url = format!("{}/api/v1/query_range", self.prometheus_url);
        let start = rfc3339(start);
        let end = rfc3339(end);
        let step = step_secs.to_string();
        let response = self
            .get(url)
            .query(&[
                ("query", query),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("step", step.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let body: PromResponse = response.json().await?;
        if body.status != "success" {
            return Err(BackendError::Rejected(body.status));
        }

        Ok(body
            .data
            .result
            .into_iter()
            .map(|series| RangeSeries {
                labels: series.metric,
                samples: series
                    .values
                    .into_iter()
                    .map(|(secs, value)| (secs as i64, value))
                    .collect(),
            })
            .collect())
    }

    async fn fetch_instant(&self, query: &str) -> Result<Vec<InstantSample>, BackendError> {
        let url = format!("{}/api/v1/query", self.prometheus_url);
        let response = self.get(url).query(&[("query", query)]).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let body: PromResponse = response.json().await?;
        if body.status != "success" {
            return Err(BackendError::Rejected(body.status));
        }

        Ok(body
            .data
            .result
            .into_iter()
            .filter_map(|series| {
                series.value.map(|(_, value)| InstantSample {
                    labels: series.metric,
                    value,
                })
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl LogStore for BackendClient {
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Vec<RawLine> {
        match self.fetch_logs(query, start, end, limit).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(%query, error = %e, "log query degraded to empty result");
                Vec::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl MetricStore for BackendClient {
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_secs: u32,
    ) -> Vec<RangeSeries> {
        match self.fetch_range(query, start, end, step_secs).await {
            Ok(series) => series,
            Err(e) => {
                warn!(%query, error = %e, "metric range query degraded to empty result");
                Vec::new()
            }
        }
    }

    async fn query_instant(&self, query: &str) -> Vec<InstantSample> {
        match self.fetch_instant(query).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!(%query, error = %e, "metric instant query degraded to empty result");
                Vec::new()
            }
        }
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
