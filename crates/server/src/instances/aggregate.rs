//! Metric aggregation — grouping raw query results into chart series.
//!
//! All grouping collapses through one code path: pick a key per raw
//! series, sum same-key values per timestamp, drop series that are zero
//! everywhere. Keys differ per view: the tenant label verbatim, the
//! service label with its deploy-hash suffix stripped, or the first
//! hyphen-delimited segment of a pod name.

use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{InstantSample, RangeSeries};
use crate::events::model::UNKNOWN_TENANT;
use crate::instances::model::{Series, SeriesPoint, TenantCurrent};

/// Top-level view: one series per value of `label` (tenant namespace).
pub fn group_by_label(series: Vec<RangeSeries>, label: &str) -> Vec<Series> {
    collapse(series, |labels| label_or_unknown(labels, label))
}

/// Drill-down view: series keyed by the owning controller, with the
/// trailing deploy-hash segment stripped so replicas of one service
/// collapse together.
pub fn group_services(series: Vec<RangeSeries>, label: &str) -> Vec<Series> {
    collapse(series, |labels| {
        strip_hash_suffix(&label_or_unknown(labels, label)).to_string()
    })
}

/// Pod-name view: no backend-side grouping available, so the key is the
/// first hyphen-delimited segment of the pod name.
pub fn group_by_pod_prefix(series: Vec<RangeSeries>, pod_label: &str) -> Vec<Series> {
    collapse(series, |labels| {
        pod_prefix(&label_or_unknown(labels, pod_label)).to_string()
    })
}

/// Current-state view: per-tenant instance counts joined with the service
/// names derived from pod names.
pub fn current_tenants(
    counts: Vec<InstantSample>,
    pods: Vec<InstantSample>,
    tenant_label: &str,
    pod_label: &str,
) -> Vec<TenantCurrent> {
    let mut by_tenant: BTreeMap<String, u64> = BTreeMap::new();
    for sample in &counts {
        // Non-integer values are excluded, same as in range grouping.
        let Ok(value) = sample.value.parse::<u64>() else {
            continue;
        };
        let namespace = label_or_unknown(&sample.labels, tenant_label);
        *by_tenant.entry(namespace).or_insert(0) += value;
    }

    let mut services: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for sample in &pods {
        let namespace = label_or_unknown(&sample.labels, tenant_label);
        if let Some(pod) = sample.labels.get(pod_label).filter(|v| !v.is_empty()) {
            services
                .entry(namespace)
                .or_default()
                .insert(pod_prefix(pod).to_string());
        }
    }

    by_tenant
        .into_iter()
        .map(|(namespace, count)| {
            let services = services
                .remove(&namespace)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default();
            TenantCurrent {
                namespace,
                count,
                services,
            }
        })
        .collect()
}

fn collapse<F>(series: Vec<RangeSeries>, key_fn: F) -> Vec<Series>
where
    F: Fn(&std::collections::HashMap<String, String>) -> String,
{
    let mut grouped: BTreeMap<String, BTreeMap<i64, u64>> = BTreeMap::new();

    for raw in series {
        let key = key_fn(&raw.labels);
        let bucket = grouped.entry(key).or_default();
        for (secs, value) in raw.samples {
            // Values that fail integer parse are excluded, not fatal.
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };
            *bucket.entry(secs * 1000).or_insert(0) += value;
        }
    }

    grouped
        .into_iter()
        .filter_map(|(key, points)| {
            if points.values().all(|v| *v == 0) {
                return None;
            }
            Some(Series {
                key,
                data: points
                    .into_iter()
                    .map(|(time, value)| SeriesPoint { time, value })
                    .collect(),
            })
        })
        .collect()
}

fn label_or_unknown(labels: &std::collections::HashMap<String, String>, label: &str) -> String {
    labels
        .get(label)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_TENANT.to_string())
}

/// Strip a trailing hyphen-delimited deploy-hash segment (4–12 lowercase
/// alphanumerics containing at least one digit) to recover the stable
/// logical name. Segments without a digit are ordinary name parts and
/// stay (`web-api` is `web-api`).
pub fn strip_hash_suffix(name: &str) -> &str {
    if let Some((prefix, suffix)) = name.rsplit_once('-') {
        let looks_like_hash = (4..=12).contains(&suffix.len())
            && suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && suffix.chars().any(|c| c.is_ascii_digit());
        if looks_like_hash && !prefix.is_empty() {
            return prefix;
        }
    }
    name
}

fn pod_prefix(pod: &str) -> &str {
    pod.split('-').next().unwrap_or(pod)
}
