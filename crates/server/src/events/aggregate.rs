//! Event aggregation — fan-out over the format queries, merge, dedup,
//! and windowed pagination.
//!
//! The merge itself is a pure function over the per-format result sets;
//! cursors go in and come out explicitly so the core is testable without
//! the HTTP tier.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::backend::LogStore;
use crate::config::{EventsConfig, LogQueriesConfig};
use crate::events::model::{EventKind, PlatformEvent};
use crate::events::parser::{
    action::ActionParser, audit::AuditParser, plan::PlanParser, signup::parse_signup, EventParser,
};

/// One page of the event feed, with the cursors the caller needs for the
/// next poll or the next backfill page.
#[derive(Debug)]
pub struct EventPage {
    pub events: Vec<PlatformEvent>,
    /// Newest timestamp seen (ms); the next live poll's `since` cursor.
    pub latest_timestamp: i64,
    /// Lower bound of the fetched window (ms); the next backfill page's
    /// `before` cursor. Live mode has no backfill cursor.
    pub oldest_timestamp: Option<i64>,
    pub has_more: bool,
}

pub struct EventAggregator {
    store: Arc<dyn LogStore>,
    queries: LogQueriesConfig,
    limit: u32,
    page_chunk: Duration,
    max_lookback: Duration,
}

impl EventAggregator {
    pub fn new(store: Arc<dyn LogStore>, queries: LogQueriesConfig, events: &EventsConfig) -> Self {
        Self {
            store,
            queries,
            limit: events.query_limit,
            page_chunk: Duration::days(events.page_chunk_days),
            max_lookback: Duration::days(events.max_lookback_days),
        }
    }

    /// Live-poll mode: everything in `[since, now]`, newest first.
    pub async fn live(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> EventPage {
        let events = self.fetch_window(since, now).await;
        let latest_timestamp = events
            .first()
            .map(|e| e.timestamp)
            .unwrap_or_else(|| since.timestamp_millis());

        EventPage {
            events,
            latest_timestamp,
            oldest_timestamp: None,
            has_more: false,
        }
    }

    /// Backfill mode: one fixed-width page ending at `before` (default
    /// now), bounded by the maximum lookback. Pages tile the lookback
    /// window exactly — the returned `oldest_timestamp` is the page's
    /// lower bound, so an empty page still advances the cursor.
    pub async fn backfill(&self, before: Option<DateTime<Utc>>, now: DateTime<Utc>) -> EventPage {
        let before = before.unwrap_or(now);
        let start = before - self.page_chunk;
        let floor = now - self.max_lookback;

        let events = self.fetch_window(start, before).await;
        let latest_timestamp = events
            .first()
            .map(|e| e.timestamp)
            .unwrap_or_else(|| before.timestamp_millis());

        EventPage {
            events,
            latest_timestamp,
            oldest_timestamp: Some(start.timestamp_millis()),
            has_more: start > floor,
        }
    }

    /// Issue all format queries concurrently and merge. A failing query
    /// already degraded to an empty result inside the store, so one bad
    /// format never aborts the others.
    async fn fetch_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<PlatformEvent> {
        let (audit, signup, action, plan) = tokio::join!(
            self.store.query_range(&self.queries.audit, start, end, self.limit),
            self.store.query_range(&self.queries.signup, start, end, self.limit),
            self.store.query_range(&self.queries.action, start, end, self.limit),
            self.store.query_range(&self.queries.plan, start, end, self.limit),
        );

        debug!(
            audit = audit.len(),
            signup = signup.len(),
            action = action.len(),
            plan = plan.len(),
            "fetched raw lines"
        );

        merge_events(
            parse_all(&AuditParser, audit),
            signup.iter().filter_map(parse_signup).collect(),
            parse_all(&ActionParser, action),
            parse_all(&PlanParser, plan),
        )
    }
}

fn parse_all(parser: &dyn EventParser, lines: Vec<crate::backend::RawLine>) -> Vec<PlatformEvent> {
    lines.iter().filter_map(|line| parser.parse(line)).collect()
}

/// Merge the per-format result sets of one window.
///
/// Rules, in order:
/// - the audit format is authoritative for tenant identity: signup-format
///   events whose tenant already appears among audit `tenant_signup`
///   events are suppressed;
/// - only the oldest signup-format event per decoded address survives
///   (repeats of the same address inside a window are retries, not
///   signups; distinct addresses sharing a local part stay distinct);
/// - everything is sorted descending by timestamp (id as tie-break for a
///   deterministic order);
/// - exact id duplicates collapse, first occurrence wins.
pub fn merge_events(
    audit: Vec<PlatformEvent>,
    signup: Vec<(String, PlatformEvent)>,
    action: Vec<PlatformEvent>,
    plan: Vec<PlatformEvent>,
) -> Vec<PlatformEvent> {
    let audit_signups: HashSet<String> = audit
        .iter()
        .filter(|e| e.kind == EventKind::TenantSignup)
        .map(|e| e.tenant.clone())
        .collect();

    let mut first_signup: HashMap<String, PlatformEvent> = HashMap::new();
    for (email, event) in signup {
        if audit_signups.contains(&event.tenant) {
            continue;
        }
        let keep = match first_signup.get(&email) {
            Some(existing) => event.timestamp < existing.timestamp,
            None => true,
        };
        if keep {
            first_signup.insert(email, event);
        }
    }

    let mut events: Vec<PlatformEvent> = audit
        .into_iter()
        .chain(first_signup.into_values())
        .chain(action)
        .chain(plan)
        .collect();

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut seen = HashSet::new();
    events.retain(|e| seen.insert(e.id.clone()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawLine;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn event(ts_nanos: i64, tenant: &str, kind: EventKind) -> PlatformEvent {
        PlatformEvent::from_nanos(ts_nanos, tenant, kind, format!("{tenant} did a thing"))
    }

    fn signup(ts_nanos: i64, email: &str) -> (String, PlatformEvent) {
        let local = email.split('@').next().unwrap();
        (
            email.to_string(),
            event(ts_nanos, local, EventKind::TenantSignup),
        )
    }

    #[test]
    fn test_merge_sorts_descending() {
        let merged = merge_events(
            vec![
                event(1_000_000_000, "a", EventKind::InstanceCreated),
                event(3_000_000_000, "b", EventKind::InstanceCreated),
            ],
            vec![],
            vec![event(2_000_000_000, "c", EventKind::PlanUpgrade)],
            vec![],
        );
        let stamps: Vec<i64> = merged.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![3_000, 2_000, 1_000]);
    }

    #[test]
    fn test_merge_drops_duplicate_ids() {
        // The same line parsed out of two overlapping windows yields an
        // identical id; only the first survives.
        let duplicate = event(5_000_000_000, "acme", EventKind::InstanceCreated);
        let merged = merge_events(
            vec![duplicate.clone(), duplicate.clone()],
            vec![],
            vec![],
            vec![],
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_overlapping_windows_have_no_duplicate_ids() {
        let window_a = vec![
            event(1_000_000_000, "a", EventKind::InstanceCreated),
            event(2_000_000_000, "b", EventKind::InstanceRemoved),
        ];
        let window_b = vec![
            event(2_000_000_000, "b", EventKind::InstanceRemoved),
            event(3_000_000_000, "c", EventKind::SolutionDeployed),
        ];

        let merged = merge_events(
            window_a.into_iter().chain(window_b).collect(),
            vec![],
            vec![],
            vec![],
        );
        let ids: HashSet<&str> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), merged.len());
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_audit_signup_suppresses_signup_format() {
        let audit = vec![event(2_000_000_000, "acme", EventKind::TenantSignup)];
        let signups = vec![signup(1_000_000_000, "acme@acme.io")];

        let merged = merge_events(audit, signups, vec![], vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].timestamp, 2_000);
    }

    #[test]
    fn test_oldest_signup_per_email_wins() {
        let signups = vec![
            signup(3_000_000_000, "jane.doe@acme.io"),
            signup(1_000_000_000, "jane.doe@acme.io"),
            signup(2_000_000_000, "jane.doe@acme.io"),
        ];

        let merged = merge_events(vec![], signups, vec![], vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].timestamp, 1_000);
    }

    #[test]
    fn test_same_local_part_different_domains_both_survive() {
        let signups = vec![
            signup(1_000_000_000, "bob@acme.io"),
            signup(2_000_000_000, "bob@initech.io"),
        ];

        let merged = merge_events(vec![], signups, vec![], vec![]);
        assert_eq!(merged.len(), 2);
    }

    // In-memory store: serves lines whose timestamp falls in the window,
    // regardless of query (every format query sees the same corpus, which
    // is fine — parsers ignore lines that are not theirs).
    struct FakeLogs {
        lines: Vec<RawLine>,
    }

    #[async_trait]
    impl LogStore for FakeLogs {
        async fn query_range(
            &self,
            _query: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _limit: u32,
        ) -> Vec<RawLine> {
            let start_ns = start.timestamp_millis() * 1_000_000;
            let end_ns = end.timestamp_millis() * 1_000_000;
            self.lines
                .iter()
                .filter(|l| l.timestamp_nanos >= start_ns && l.timestamp_nanos <= end_ns)
                .cloned()
                .collect()
        }
    }

    fn aggregator(lines: Vec<RawLine>) -> EventAggregator {
        EventAggregator::new(
            Arc::new(FakeLogs { lines }),
            LogQueriesConfig::default(),
            &EventsConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_live_mode_cursor() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let since = now - Duration::minutes(5);
        let ts = (now - Duration::minutes(1)).timestamp_millis() * 1_000_000;

        let agg = aggregator(vec![RawLine {
            timestamp_nanos: ts,
            line: "customer=acme action create:instance on resource couchdb/acme-db-1".into(),
        }]);

        let page = agg.live(since, now).await;
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.latest_timestamp, ts / 1_000_000);
        assert!(!page.has_more);
        assert!(page.oldest_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_live_mode_empty_window_echoes_since() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let since = now - Duration::minutes(5);

        let page = aggregator(vec![]).live(since, now).await;
        assert!(page.events.is_empty());
        assert_eq!(page.latest_timestamp, since.timestamp_millis());
    }

    #[tokio::test]
    async fn test_backfill_pages_tile_the_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let agg = aggregator(vec![]);

        let mut before = None;
        let mut page_count = 0;
        let mut lower_bound = now;
        loop {
            let page = agg.backfill(before, now).await;
            let oldest = page.oldest_timestamp.expect("backfill always has a cursor");

            // Each page starts exactly where the previous one ended.
            assert_eq!(
                oldest,
                (lower_bound - Duration::days(3)).timestamp_millis()
            );
            lower_bound -= Duration::days(3);
            page_count += 1;

            if !page.has_more {
                break;
            }
            before = DateTime::from_timestamp_millis(oldest);
            assert!(before.is_some());
        }

        // 30 days of lookback in 3-day chunks.
        assert_eq!(page_count, 10);
        assert_eq!(lower_bound, now - Duration::days(30));
    }
}
