//! Plan-change format.
//!
//! The legacy billing gateway only logs the request path, so a matching
//! line yields a generic "plan updated" event attributed to the `unknown`
//! placeholder tenant with `tenant_resolved: false`. This is a known gap in
//! the source format, preserved deliberately and flagged for the caller —
//! do not infer a tenant here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::RawLine;
use crate::events::model::{EventKind, PlatformEvent, UNKNOWN_TENANT};
use crate::events::parser::EventParser;

static PLAN_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:POST|PUT|PATCH) /api/v1/billing/plan\b").unwrap());

pub struct PlanParser;

impl EventParser for PlanParser {
    fn parse(&self, line: &RawLine) -> Option<PlatformEvent> {
        if !PLAN_PATH_RE.is_match(&line.line) {
            return None;
        }

        Some(PlatformEvent::from_nanos(
            line.timestamp_nanos,
            UNKNOWN_TENANT,
            EventKind::Other,
            format!("{UNKNOWN_TENANT} updated their plan"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ts: i64, line: &str) -> RawLine {
        RawLine {
            timestamp_nanos: ts,
            line: line.to_string(),
        }
    }

    #[test]
    fn test_plan_path_match() {
        let line = raw(
            1_700_000_003_000_000_000,
            r#"10.0.4.2 - "POST /api/v1/billing/plan HTTP/1.1" 200 182"#,
        );
        let event = PlanParser.parse(&line).unwrap();

        assert_eq!(event.kind, EventKind::Other);
        assert_eq!(event.tenant, UNKNOWN_TENANT);
        assert!(!event.tenant_resolved);
        assert_eq!(event.timestamp, 1_700_000_003_000);
    }

    #[test]
    fn test_reads_are_skipped() {
        let line = raw(1, r#""GET /api/v1/billing/plan HTTP/1.1" 200 55"#);
        assert!(PlanParser.parse(&line).is_none());
    }

    #[test]
    fn test_other_paths_are_skipped() {
        let line = raw(1, r#""POST /api/v1/billing/invoice HTTP/1.1" 201 90"#);
        assert!(PlanParser.parse(&line).is_none());
    }
}
