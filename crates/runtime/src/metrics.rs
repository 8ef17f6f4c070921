use std::collections::BTreeMap;

pub const FETCH_STARTED: &str = "fetch.started";
pub const FETCH_JOINED: &str = "fetch.joined";
pub const FETCH_CACHE_HIT: &str = "fetch.cache_hit";
pub const FETCH_FAILED: &str = "fetch.failed";
pub const FETCH_STALE: &str = "fetch.stale";
pub const RECORDS_PARSED: &str = "records.parsed";
pub const RECORDS_MALFORMED: &str = "records.malformed";
pub const DRAW_CREATED: &str = "draw.created";
pub const DRAW_UPDATED: &str = "draw.updated";
pub const DRAW_DETACHED: &str = "draw.detached";
pub const CATALOG_LOADS: &str = "catalog.loads";

/// Deterministic counters and gauges.
///
/// Sorted maps keep snapshots stable for logs and reports.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub gauges: Vec<(String, i64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            gauges: self.gauges.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FETCH_JOINED, FETCH_STARTED, Metrics};

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc(FETCH_STARTED);
        m.add(FETCH_STARTED, 2);
        assert_eq!(m.counter(FETCH_STARTED), 3);
        assert_eq!(m.counter(FETCH_JOINED), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge("layers.visible"), None);
        m.set_gauge("layers.visible", 2);
        m.set_gauge("layers.visible", 1);
        assert_eq!(m.gauge("layers.visible"), Some(1));
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut m = Metrics::new();
        m.inc(FETCH_STARTED);
        m.inc(FETCH_JOINED);
        let snap = m.snapshot();
        assert_eq!(
            snap.counters,
            vec![
                ("fetch.joined".to_string(), 1),
                ("fetch.started".to_string(), 1)
            ]
        );
    }
}
