//! Structured-action format.
//!
//! The control plane logs a JSON payload inside a logfmt `msg` field with
//! escaped quotes:
//!
//! ```text
//! level=info msg="{\"action\":\"plan.upgrade\",\"success\":true,\"tenantId\":\"acme\"}"
//! ```
//!
//! Only the write-action allow-list is eligible, and only when
//! `success == true`. Malformed JSON is skipped, never surfaced.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::backend::RawLine;
use crate::events::model::{EventKind, PlatformEvent, UNKNOWN_TENANT};
use crate::events::parser::EventParser;

static MSG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"msg="((?:[^"\\]|\\.)*)""#).unwrap());

#[derive(Debug, Deserialize)]
struct ActionRecord {
    action: String,
    #[serde(default)]
    success: bool,
    #[serde(rename = "tenantId")]
    tenant_id: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    /// Refines `plan.change` into upgrade/downgrade.
    #[serde(rename = "type")]
    change_type: Option<String>,
}

pub struct ActionParser;

impl EventParser for ActionParser {
    fn parse(&self, line: &RawLine) -> Option<PlatformEvent> {
        let escaped = MSG_RE.captures(&line.line)?.get(1)?.as_str();
        let payload = unescape(escaped);

        let record: ActionRecord = serde_json::from_str(&payload).ok()?;
        if !record.success {
            return None;
        }

        let kind = match record.action.as_str() {
            "plan.upgrade" => EventKind::PlanUpgrade,
            "plan.downgrade" => EventKind::PlanDowngrade,
            "plan.change" => match record.change_type.as_deref() {
                Some("upgrade") => EventKind::PlanUpgrade,
                Some("downgrade") => EventKind::PlanDowngrade,
                _ => EventKind::Other,
            },
            "solution.deploy" => EventKind::SolutionDeployed,
            "solution.destroy" => EventKind::SolutionDestroyed,
            // Reads and unknown verbs are not eligible.
            _ => return None,
        };

        let tenant = record.tenant_id.as_deref().unwrap_or(UNKNOWN_TENANT);
        let description = describe(kind, tenant, record.resource.as_deref());

        Some(PlatformEvent::from_nanos(
            line.timestamp_nanos,
            tenant,
            kind,
            description,
        ))
    }
}

/// Undo the logfmt quoting of the embedded payload (`\"` and `\\`).
fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn describe(kind: EventKind, tenant: &str, resource: Option<&str>) -> String {
    match kind {
        EventKind::PlanUpgrade => format!("{tenant} upgraded their plan"),
        EventKind::PlanDowngrade => format!("{tenant} downgraded their plan"),
        EventKind::SolutionDeployed => match resource {
            Some(name) => format!("{tenant} deployed solution {name}"),
            None => format!("{tenant} deployed a solution"),
        },
        EventKind::SolutionDestroyed => match resource {
            Some(name) => format!("{tenant} destroyed solution {name}"),
            None => format!("{tenant} destroyed a solution"),
        },
        _ => format!("{tenant} updated their plan"),
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
    fn test_plan_upgrade() {
        let line = raw(
            1_700_000_002_000_000_000,
            r#"level=info msg="{\"action\":\"plan.upgrade\",\"success\":true,\"tenantId\":\"acme\",\"resource\":\"plan/pro\"}""#,
        );
        let event = ActionParser.parse(&line).unwrap();

        assert_eq!(event.kind, EventKind::PlanUpgrade);
        assert_eq!(event.tenant, "acme");
        assert_eq!(event.description, "acme upgraded their plan");
    }

    #[test]
    fn test_plan_change_refined_by_type() {
        let line = raw(
            1,
            r#"msg="{\"action\":\"plan.change\",\"success\":true,\"tenantId\":\"acme\",\"type\":\"downgrade\"}""#,
        );
        let event = ActionParser.parse(&line).unwrap();
        assert_eq!(event.kind, EventKind::PlanDowngrade);

        let line = raw(
            2,
            r#"msg="{\"action\":\"plan.change\",\"success\":true,\"tenantId\":\"acme\"}""#,
        );
        let event = ActionParser.parse(&line).unwrap();
        assert_eq!(event.kind, EventKind::Other);
    }

    #[test]
    fn test_failed_action_is_skipped() {
        let line = raw(
            1,
            r#"msg="{\"action\":\"plan.upgrade\",\"success\":false,\"tenantId\":\"acme\"}""#,
        );
        assert!(ActionParser.parse(&line).is_none());
    }

    #[test]
    fn test_action_outside_allow_list_is_skipped() {
        let line = raw(
            1,
            r#"msg="{\"action\":\"plan.read\",\"success\":true,\"tenantId\":\"acme\"}""#,
        );
        assert!(ActionParser.parse(&line).is_none());
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let line = raw(1, r#"msg="{\"action\":\"plan.upgrade\",""#);
        assert!(ActionParser.parse(&line).is_none());
    }

    #[test]
    fn test_missing_tenant_uses_placeholder() {
        let line = raw(
            1,
            r#"msg="{\"action\":\"solution.deploy\",\"success\":true,\"resource\":\"crm\"}""#,
        );
        let event = ActionParser.parse(&line).unwrap();
        assert_eq!(event.tenant, UNKNOWN_TENANT);
        assert!(!event.tenant_resolved);
        assert_eq!(event.description, "unknown deployed solution crm");
    }

    #[test]
    fn test_unescape_nested_backslash() {
        assert_eq!(unescape(r#"a\"b\\c"#), r#"a"b\c"#);
    }
}
