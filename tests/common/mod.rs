#![allow(dead_code)]

use fundlens::domain::error::EngineError;
use fundlens::domain::quarter::Quarter;
use fundlens::domain::snapshot::{Holding, Snapshot};
use fundlens::ports::cluster_port::ClusterLookup;
use fundlens::ports::snapshot_port::SnapshotPort;
use std::collections::BTreeMap;

pub struct MockSnapshotPort {
    pub data: BTreeMap<String, Vec<Snapshot>>,
    pub errors: BTreeMap<String, String>,
}

impl MockSnapshotPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_fund(mut self, fund: &str, snapshots: Vec<Snapshot>) -> Self {
        self.data.insert(fund.to_string(), snapshots);
        self
    }

    pub fn with_error(mut self, fund: &str, reason: &str) -> Self {
        self.errors.insert(fund.to_string(), reason.to_string());
        self
    }
}

impl SnapshotPort for MockSnapshotPort {
    fn load_snapshots(&self, fund_id: &str) -> Result<Vec<Snapshot>, EngineError> {
        if let Some(reason) = self.errors.get(fund_id) {
            return Err(EngineError::SnapshotSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(fund_id).cloned().unwrap_or_default())
    }

    fn list_funds(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.data.keys().chain(self.errors.keys()).cloned().collect())
    }
}

/// Fixed identifier → label table.
pub struct StaticLookup(pub BTreeMap<String, String>);

impl StaticLookup {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        )
    }
}

impl ClusterLookup for StaticLookup {
    fn label_for(&self, identifier: &str, _issuer_label: &str) -> Option<String> {
        self.0.get(identifier).cloned()
    }
}

pub fn q(s: &str) -> Quarter {
    s.parse().unwrap()
}

pub fn holding(id: &str, value: f64) -> Holding {
    Holding::new(id, &format!("{id} CORP"), (value / 100.0) as u64, value)
}

pub fn snap(fund: &str, quarter: &str, holdings: Vec<Holding>) -> Snapshot {
    Snapshot::from_holdings(fund, q(quarter), holdings)
}

/// Consecutive quarters from `start`, one snapshot per holdings list.
pub fn quarterly(fund: &str, start: &str, quarters: Vec<Vec<Holding>>) -> Vec<Snapshot> {
    let mut quarter = q(start);
    quarters
        .into_iter()
        .map(|holdings| {
            let s = Snapshot::from_holdings(fund, quarter, holdings);
            quarter = quarter.next();
            s
        })
        .collect()
}

pub const SNAPSHOT_HEADER: &str = "quarter,identifier,issuer,shares,value\n";

/// CSV rows for `snapshots`, in the layout the CSV snapshot adapter reads.
pub fn to_csv(snapshots: &[Snapshot]) -> String {
    let mut out = String::from(SNAPSHOT_HEADER);
    for s in snapshots {
        for h in &s.holdings {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                s.quarter, h.identifier, h.issuer_label, h.shares, h.value
            ));
        }
    }
    out
}
