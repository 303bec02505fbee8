//! Wire types for the log-store and metric-store HTTP APIs.
//!
//! Both backends wrap their payload in a `{"status": ..., "data": ...}`
//! envelope. Only the fields this service reads are modeled; everything
//! else in the response is ignored by serde.

use serde::Deserialize;
use std::collections::HashMap;

/// Envelope of a log-store (`/loki/api/v1/query_range`) response.
#[derive(Debug, Deserialize)]
pub struct LokiResponse {
    pub status: String,
    pub data: LokiData,
}

#[derive(Debug, Deserialize)]
pub struct LokiData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<LokiStream>,
}

/// One log stream: label set plus `[nanosecond-timestamp, line]` pairs.
/// Timestamps arrive as decimal strings because they exceed JSON's safe
/// integer range.
#[derive(Debug, Deserialize)]
pub struct LokiStream {
    #[serde(default)]
    pub stream: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<(String, String)>,
}

/// Envelope of a metric-store (`/api/v1/query_range` or `/api/v1/query`)
/// response.
#[derive(Debug, Deserialize)]
pub struct PromResponse {
    pub status: String,
    pub data: PromData,
}

#[derive(Debug, Deserialize)]
pub struct PromData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<PromSeries>,
}

/// One metric series. Range queries fill `values`; instant queries fill
/// `value`. Sample values are stringified numbers per the API.
#[derive(Debug, Deserialize)]
pub struct PromSeries {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
    #[serde(default)]
    pub value: Option<(f64, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loki_response_shape() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "streams",
                "result": [
                    {
                        "stream": {"app": "audit-log"},
                        "values": [
                            ["1700000000000000000", "customer=acme action create:instance on resource couchdb/acme-db-1"]
                        ]
                    }
                ]
            }
        }"#;

        let parsed: LokiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.data.result.len(), 1);
        let stream = &parsed.data.result[0];
        assert_eq!(stream.stream.get("app").map(String::as_str), Some("audit-log"));
        assert_eq!(stream.values[0].0, "1700000000000000000");
    }

    #[test]
    fn test_prom_range_response_shape() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {
                        "metric": {"namespace": "acme"},
                        "values": [[1700000000, "5"], [1700000600, "6"]]
                    }
                ]
            }
        }"#;

        let parsed: PromResponse = serde_json::from_str(body).unwrap();
        let series = &parsed.data.result[0];
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.values[1], (1700000600.0, "6".to_string()));
        assert!(series.value.is_none());
    }

    #[test]
    fn test_prom_instant_response_shape() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"namespace": "acme"}, "value": [1700000000.123, "3"]}
                ]
            }
        }"#;

        let parsed: PromResponse = serde_json::from_str(body).unwrap();
        let series = &parsed.data.result[0];
        assert_eq!(series.value, Some((1700000000.123, "3".to_string())));
        assert!(series.values.is_empty());
    }
}
