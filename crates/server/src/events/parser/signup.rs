//! Signup-flow format.
//!
//! The signup service logs the submitted address url-encoded, e.g.
//! `POST /signup email=jane.doe%40acme.io step=verify`. The tenant name is
//! the lowercased local part of the decoded address. Repeats of the same
//! address inside one fetch window are suppressed by the aggregator, not
//! here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::RawLine;
use crate::events::model::{EventKind, PlatformEvent};
use crate::events::parser::EventParser;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"email=([^\s&"]+)"#).unwrap());

pub struct SignupParser;

/// Parse a signup line into the event plus the full decoded address. The
/// aggregator keys retry suppression on the address, not the tenant name,
/// so `bob@acme.io` and `bob@initech.io` stay distinct events.
pub fn parse_signup(line: &RawLine) -> Option<(String, PlatformEvent)> {
    let encoded = EMAIL_RE.captures(&line.line)?.get(1)?.as_str();
    let email = urlencoding::decode(encoded).ok()?.trim().to_lowercase();

    let local = email.split('@').next()?.to_string();
    if local.is_empty() {
        return None;
    }

    let event = PlatformEvent::from_nanos(
        line.timestamp_nanos,
        &local,
        EventKind::TenantSignup,
        format!("{local} signed up"),
    );
    Some((email, event))
}

impl EventParser for SignupParser {
    fn parse(&self, line: &RawLine) -> Option<PlatformEvent> {
        parse_signup(line).map(|(_, event)| event)
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
    fn test_urlencoded_email() {
        let line = raw(
            1_700_000_001_000_000_000,
            "POST /signup email=Jane.Doe%40acme.io step=verify",
        );
        let event = SignupParser.parse(&line).unwrap();

        assert_eq!(event.kind, EventKind::TenantSignup);
        assert_eq!(event.tenant, "jane.doe");
        assert_eq!(event.description, "jane.doe signed up");
        assert_eq!(event.timestamp, 1_700_000_001_000);
    }

    #[test]
    fn test_plain_email() {
        let line = raw(1, "email=bob@initech.io");
        let (email, event) = parse_signup(&line).unwrap();
        assert_eq!(email, "bob@initech.io");
        assert_eq!(event.tenant, "bob");
    }

    #[test]
    fn test_no_email_field_is_skipped() {
        let line = raw(1, "POST /signup step=verify");
        assert!(SignupParser.parse(&line).is_none());
    }

    #[test]
    fn test_bad_encoding_is_skipped() {
        // Escapes that decode to invalid UTF-8 must not produce an event.
        let line = raw(1, "email=%ff%fe@acme.io");
        assert!(SignupParser.parse(&line).is_none());
    }

    #[test]
    fn test_empty_local_part_is_skipped() {
        let line = raw(1, "email=%40acme.io");
        assert!(SignupParser.parse(&line).is_none());
    }
}
