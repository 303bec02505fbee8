//! Outbound query tier.
//!
//! The aggregators talk to the backends through the [`LogStore`] and
//! [`MetricStore`] traits so tests can substitute in-memory fakes.
//! [`client::BackendClient`] implements both against the real HTTP APIs.

pub mod client;
pub mod model;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One raw line from the log store with its source-assigned timestamp.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Nanoseconds since epoch, as assigned by the log store.
    pub timestamp_nanos: i64,
    pub line: String,
}

/// One series from a metric range query: label set plus
/// `(epoch-seconds, stringified-value)` samples.
#[derive(Debug, Clone)]
pub struct RangeSeries {
    pub labels: HashMap<String, String>,
    pub samples: Vec<(i64, String)>,
}

/// One sample from a metric instant query.
#[derive(Debug, Clone)]
pub struct InstantSample {
    pub labels: HashMap<String, String>,
    pub value: String,
}

/// Range queries against the log store.
///
/// Every read is best-effort: transport failures and non-2xx responses
/// degrade to an empty result (logged by the implementation), never an
/// error. Callers must not treat empty as failure.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Vec<RawLine>;
}

/// Range and instant queries against the metric store. Same degrade-to-empty
/// contract as [`LogStore`].
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_secs: u32,
    ) -> Vec<RangeSeries>;

    async fn query_instant(&self, query: &str) -> Vec<InstantSample>;
}
