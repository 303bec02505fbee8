//! Event taxonomy and the normalized event record.

use serde::Serialize;

/// Normalized event taxonomy. Serializes with snake_case wire names
/// (`instance_created`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InstanceCreated,
    InstanceRemoved,
    InstanceRestarted,
    TenantSignup,
    SolutionDeployed,
    SolutionDestroyed,
    PlanUpgrade,
    PlanDowngrade,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InstanceCreated => "instance_created",
            EventKind::InstanceRemoved => "instance_removed",
            EventKind::InstanceRestarted => "instance_restarted",
            EventKind::TenantSignup => "tenant_signup",
            EventKind::SolutionDeployed => "solution_deployed",
            EventKind::SolutionDestroyed => "solution_destroyed",
            EventKind::PlanUpgrade => "plan_upgrade",
            EventKind::PlanDowngrade => "plan_downgrade",
            EventKind::Other => "other",
        }
    }

    /// Display glyph carried in the event record.
    pub fn emoji(&self) -> &'static str {
        match self {
            EventKind::InstanceCreated => "🚀",
            EventKind::InstanceRemoved => "🗑️",
            EventKind::InstanceRestarted => "🔄",
            EventKind::TenantSignup => "🎉",
            EventKind::SolutionDeployed => "📦",
            EventKind::SolutionDestroyed => "💥",
            EventKind::PlanUpgrade => "⬆️",
            EventKind::PlanDowngrade => "⬇️",
            EventKind::Other => "📋",
        }
    }
}

/// Audit-line action verbs and the kinds they map to. Adding an action is
/// a data change here, not a control-flow change in the parser.
pub const AUDIT_ACTIONS: &[(&str, EventKind)] = &[
    ("create:instance", EventKind::InstanceCreated),
    ("delete:instance", EventKind::InstanceRemoved),
    ("restart:instance", EventKind::InstanceRestarted),
    ("create:tenant", EventKind::TenantSignup),
    ("deploy:solution", EventKind::SolutionDeployed),
    ("delete:solution", EventKind::SolutionDestroyed),
];

pub fn kind_for_audit_action(verb: &str) -> Option<EventKind> {
    AUDIT_ACTIONS
        .iter()
        .find(|(action, _)| *action == verb)
        .map(|(_, kind)| *kind)
}

/// Placeholder tenant for formats that cannot attribute one.
pub const UNKNOWN_TENANT: &str = "unknown";

/// One normalized platform event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEvent {
    /// Composite of (raw timestamp, tenant, kind) — the dedup key across
    /// overlapping fetch windows.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub emoji: &'static str,
    pub tenant: String,
    /// False when the source format carries no tenant attribution; the
    /// tenant field then holds the `"unknown"` placeholder.
    pub tenant_resolved: bool,
    /// Rendered sentence with the tenant name embedded verbatim.
    pub description: String,
    /// Milliseconds since epoch. Not unique; the id disambiguates.
    pub timestamp: i64,
}

impl PlatformEvent {
    /// Build an event from a nanosecond source timestamp. The id is a pure
    /// function of `(raw timestamp, tenant, kind)` so re-parsing the same
    /// line always yields the same id.
    pub fn from_nanos(
        timestamp_nanos: i64,
        tenant: &str,
        kind: EventKind,
        description: String,
    ) -> Self {
        Self {
            id: format!("{}-{}-{}", timestamp_nanos, tenant, kind.as_str()),
            kind,
            emoji: kind.emoji(),
            tenant: tenant.to_string(),
            tenant_resolved: tenant != UNKNOWN_TENANT,
            description,
            timestamp: timestamp_nanos / 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_deterministic() {
        let a = PlatformEvent::from_nanos(
            1_700_000_000_000_000_000,
            "acme",
            EventKind::InstanceCreated,
            "acme created instance acme-db-1 on couchdb".to_string(),
        );
        let b = PlatformEvent::from_nanos(
            1_700_000_000_000_000_000,
            "acme",
            EventKind::InstanceCreated,
            "acme created instance acme-db-1 on couchdb".to_string(),
        );
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "1700000000000000000-acme-instance_created");
    }

    #[test]
    fn test_nanos_to_millis() {
        let event = PlatformEvent::from_nanos(
            1_700_000_000_000_000_000,
            "acme",
            EventKind::InstanceCreated,
            String::new(),
        );
        assert_eq!(event.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_unknown_tenant_is_flagged() {
        let event = PlatformEvent::from_nanos(
            1_700_000_000_000_000_000,
            UNKNOWN_TENANT,
            EventKind::Other,
            "unknown updated their plan".to_string(),
        );
        assert!(!event.tenant_resolved);
    }

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_value(EventKind::InstanceCreated).unwrap();
        assert_eq!(json, serde_json::json!("instance_created"));
    }

    #[test]
    fn test_audit_action_table() {
        assert_eq!(
            kind_for_audit_action("create:instance"),
            Some(EventKind::InstanceCreated)
        );
        assert_eq!(
            kind_for_audit_action("delete:solution"),
            Some(EventKind::SolutionDestroyed)
        );
        assert_eq!(kind_for_audit_action("read:instance"), None);
    }
}
