//! Chart series types and the fixed range→step policy.

use serde::Serialize;
use std::str::FromStr;

/// One chart sample: epoch milliseconds and an instance count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub time: i64,
    pub value: u64,
}

/// One stacked-chart series, keyed by tenant namespace or service name.
/// `data` is strictly increasing in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub data: Vec<SeriesPoint>,
}

/// Per-tenant summary for the current-state view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantCurrent {
    pub namespace: String,
    pub count: u64,
    pub services: Vec<String>,
}

/// Selectable chart ranges. The step mapping is fixed policy:
/// ≤1h→60s, ≤6h→300s, ≤24h→600s, ≤48h→1200s, else 3600s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRange {
    H1,
    H6,
    H12,
    H24,
    H48,
    D7,
}

impl GraphRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphRange::H1 => "1h",
            GraphRange::H6 => "6h",
            GraphRange::H12 => "12h",
            GraphRange::H24 => "24h",
            GraphRange::H48 => "48h",
            GraphRange::D7 => "7d",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            GraphRange::H1 => chrono::Duration::hours(1),
            GraphRange::H6 => chrono::Duration::hours(6),
            GraphRange::H12 => chrono::Duration::hours(12),
            GraphRange::H24 => chrono::Duration::hours(24),
            GraphRange::H48 => chrono::Duration::hours(48),
            GraphRange::D7 => chrono::Duration::days(7),
        }
    }

    pub fn step_secs(&self) -> u32 {
        match self {
            GraphRange::H1 => 60,
            GraphRange::H6 => 300,
            GraphRange::H12 | GraphRange::H24 => 600,
            GraphRange::H48 => 1200,
            GraphRange::D7 => 3600,
        }
    }
}

impl FromStr for GraphRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(GraphRange::H1),
            "6h" => Ok(GraphRange::H6),
            "12h" => Ok(GraphRange::H12),
            "24h" => Ok(GraphRange::H24),
            "48h" => Ok(GraphRange::H48),
            "7d" => Ok(GraphRange::D7),
            _ => Err(()),
        }
    }
}
