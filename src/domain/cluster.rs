//! Sector/theme exposure roll-ups.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::snapshot::Snapshot;
use crate::ports::cluster_port::ClusterLookup;

/// Reserved label for holdings the lookup cannot place.
pub const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAggregate {
    pub label: String,
    pub total_value: f64,
    /// `None` when the snapshot total is zero.
    pub total_weight: Option<f64>,
    pub holding_count: usize,
    /// Net change against the prior quarter's cluster, when one was supplied.
    pub value_change: Option<f64>,
    pub weight_change: Option<f64>,
}

impl ClusterAggregate {
    fn empty(label: &str) -> Self {
        ClusterAggregate {
            label: label.to_string(),
            total_value: 0.0,
            total_weight: None,
            holding_count: 0,
            value_change: None,
            weight_change: None,
        }
    }
}

/// The lookup's label for a holding, if it has a non-blank one.
pub fn known_label(lookup: &dyn ClusterLookup, identifier: &str, issuer: &str) -> Option<String> {
    lookup
        .label_for(identifier, issuer)
        .filter(|l| !l.trim().is_empty())
}

fn label_or_unclassified(lookup: &dyn ClusterLookup, identifier: &str, issuer: &str) -> String {
    known_label(lookup, identifier, issuer).unwrap_or_else(|| UNCLASSIFIED.to_string())
}

/// Identifier → cluster label for every resolved holding in `snapshot`.
pub fn assign_clusters(snapshot: &Snapshot, lookup: &dyn ClusterLookup) -> BTreeMap<String, String> {
    snapshot
        .holdings
        .iter()
        .filter(|h| h.is_resolved())
        .map(|h| {
            (
                h.identifier.clone(),
                label_or_unclassified(lookup, &h.identifier, &h.issuer_label),
            )
        })
        .collect()
}

fn roll_up(snapshot: &Snapshot, lookup: &dyn ClusterLookup) -> BTreeMap<String, ClusterAggregate> {
    let mut clusters: BTreeMap<String, ClusterAggregate> = BTreeMap::new();
    for holding in &snapshot.holdings {
        let label = label_or_unclassified(lookup, &holding.identifier, &holding.issuer_label);
        let agg = clusters
            .entry(label.clone())
            .or_insert_with(|| ClusterAggregate::empty(&label));
        agg.total_value += holding.value;
        agg.holding_count += 1;
    }
    for agg in clusters.values_mut() {
        agg.total_weight = snapshot.weight_of(agg.total_value);
    }
    clusters
}

/// Exposure by cluster for `snapshot`. With a `prior` snapshot each cluster
/// also carries its net change; clusters the fund left entirely appear with
/// zero current exposure.
pub fn summarize_clusters(
    snapshot: &Snapshot,
    prior: Option<&Snapshot>,
    lookup: &dyn ClusterLookup,
) -> BTreeMap<String, ClusterAggregate> {
    let mut current = roll_up(snapshot, lookup);
    let Some(prior) = prior else {
        return current;
    };

    let previous = roll_up(prior, lookup);
    for label in previous.keys() {
        current.entry(label.clone()).or_insert_with(|| ClusterAggregate {
            total_weight: snapshot.weight_of(0.0),
            ..ClusterAggregate::empty(label)
        });
    }
    for (label, agg) in current.iter_mut() {
        let before = previous.get(label);
        let before_value = before.map_or(0.0, |b| b.total_value);
        agg.value_change = Some(agg.total_value - before_value);
        agg.weight_change = match (agg.total_weight, prior.has_weights()) {
            (Some(now), true) => Some(now - before.and_then(|b| b.total_weight).unwrap_or(0.0)),
            _ => None,
        };
    }
    current
}
