//! The immutable result of one orchestration pass.

use crate::market::{MetricId, MetricValue, Provenance, Resolved};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// All metric values resolved for one request, with per-metric provenance
/// and the list of metrics that exhausted their fallback chains.
///
/// A snapshot is built once per request and never mutated afterwards. Route
/// construction only ever runs against a fully assembled snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    values: HashMap<MetricId, MetricValue>,
    provenance: HashMap<MetricId, Provenance>,
    missing: Vec<MetricId>,
}

impl Snapshot {
    pub fn from_resolutions(results: Vec<Resolved>) -> Self {
        let mut values = HashMap::new();
        let mut provenance = HashMap::new();
        let mut missing = Vec::new();

        for r in results {
            provenance.insert(r.metric, r.provenance);
            match r.value {
                Some(v) => {
                    values.insert(r.metric, v);
                }
                None => missing.push(r.metric),
            }
        }
        // Keep the missing list in a stable order regardless of task
        // completion order.
        missing.sort();

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            values,
            provenance,
            missing,
        }
    }

    /// Build a snapshot directly from (metric, value) pairs. Every supplied
    /// metric is tagged with the given provenance; everything else reads as
    /// unavailable. Intended for tests and offline evaluation.
    pub fn from_values(pairs: &[(MetricId, f64)], provenance: Provenance) -> Self {
        let resolutions = pairs
            .iter()
            .map(|(id, v)| Resolved::hit(*id, MetricValue::Number(*v), provenance, "seed"))
            .collect();
        Self::from_resolutions(resolutions)
    }

    pub fn value(&self, id: MetricId) -> Option<&MetricValue> {
        self.values.get(&id)
    }

    /// Numeric view of a metric. `None` when the metric is unavailable or
    /// carries a non-numeric payload.
    pub fn number(&self, id: MetricId) -> Option<f64> {
        self.values.get(&id).and_then(MetricValue::as_f64)
    }

    pub fn provenance(&self, id: MetricId) -> Provenance {
        self.provenance
            .get(&id)
            .copied()
            .unwrap_or(Provenance::Unavailable)
    }

    pub fn provenance_map(&self) -> &HashMap<MetricId, Provenance> {
        &self.provenance
    }

    pub fn missing(&self) -> &[MetricId] {
        &self.missing
    }

    pub fn is_missing(&self, id: MetricId) -> bool {
        self.missing.contains(&id)
    }

    pub fn resolved_count(&self) -> usize {
        self.values.len()
    }
}
