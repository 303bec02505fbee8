//! Audit-line format.
//!
//! Lines look like:
//!
//! ```text
//! ts=... customer=acme user=ops@acme.io action create:instance on resource couchdb/acme-db-1 outcome=allow
//! ```
//!
//! Both the `customer=` field and the `action <verb> on resource <path>`
//! phrase must be present; anything else is log noise and is skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::RawLine;
use crate::events::model::{kind_for_audit_action, EventKind, PlatformEvent};
use crate::events::parser::EventParser;

static CUSTOMER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"customer=([A-Za-z0-9._-]+)").unwrap());

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"action ([a-z]+:[a-z]+) on resource ([^\s"]+)"#).unwrap()
});

pub struct AuditParser;

impl EventParser for AuditParser {
    fn parse(&self, line: &RawLine) -> Option<PlatformEvent> {
        let tenant = CUSTOMER_RE.captures(&line.line)?.get(1)?.as_str();
        let action = ACTION_RE.captures(&line.line)?;
        let verb = action.get(1)?.as_str();
        let resource = action.get(2)?.as_str();

        // Unrecognized verbs are not an error, just uninteresting reads.
        let kind = kind_for_audit_action(verb)?;
        let description = describe(kind, tenant, resource);

        Some(PlatformEvent::from_nanos(
            line.timestamp_nanos,
            tenant,
            kind,
            description,
        ))
    }
}

fn describe(kind: EventKind, tenant: &str, resource: &str) -> String {
    // Resource paths of the form `service/instance` split on the first `/`;
    // bare names (solutions, tenants) are used as-is.
    let (service, name) = match resource.split_once('/') {
        Some((service, instance)) => (service, instance),
        None => (resource, resource),
    };

    match kind {
        EventKind::InstanceCreated => {
            format!("{tenant} created instance {name} on {service}")
        }
        EventKind::InstanceRemoved => {
            format!("{tenant} removed instance {name} from {service}")
        }
        EventKind::InstanceRestarted => {
            format!("{tenant} restarted instance {name} on {service}")
        }
        EventKind::TenantSignup => format!("{tenant} signed up"),
        EventKind::SolutionDeployed => format!("{tenant} deployed solution {name}"),
        EventKind::SolutionDestroyed => format!("{tenant} destroyed solution {name}"),
        // Plan kinds never come out of the audit action table.
        EventKind::PlanUpgrade | EventKind::PlanDowngrade | EventKind::Other => {
            format!("{tenant} updated their plan")
        }
    }
}
