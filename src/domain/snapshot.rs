//! Snapshot input records: one fund, one quarter.

use serde::{Deserialize, Serialize};

use crate::domain::quarter::Quarter;

/// A single reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Normalized security key. Blank means the security could not be resolved.
    pub identifier: String,
    pub issuer_label: String,
    pub shares: u64,
    pub value: f64,
}

impl Holding {
    pub fn new(identifier: &str, issuer_label: &str, shares: u64, value: f64) -> Self {
        Holding {
            identifier: identifier.trim().to_string(),
            issuer_label: issuer_label.to_string(),
            shares,
            value,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.identifier.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fund_id: String,
    pub quarter: Quarter,
    pub total_value: f64,
    pub holdings: Vec<Holding>,
}

impl Snapshot {
    /// Builds a snapshot with holdings ordered by identifier.
    pub fn new(fund_id: &str, quarter: Quarter, total_value: f64, mut holdings: Vec<Holding>) -> Self {
        holdings.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Snapshot {
            fund_id: fund_id.to_string(),
            quarter,
            total_value,
            holdings,
        }
    }

    /// Snapshot whose total is the sum of its holding values, as 13F
    /// cover pages report it.
    pub fn from_holdings(fund_id: &str, quarter: Quarter, holdings: Vec<Holding>) -> Self {
        let total = holdings.iter().map(|h| h.value).sum();
        Snapshot::new(fund_id, quarter, total, holdings)
    }

    pub fn has_weights(&self) -> bool {
        self.total_value > 0.0
    }

    /// Fraction of the portfolio held in `value`; `None` when the total is zero.
    pub fn weight_of(&self, value: f64) -> Option<f64> {
        weight(value, self.total_value)
    }

    /// Sum of all derived weights, or `None` when weights are undefined.
    pub fn weight_sum(&self) -> Option<f64> {
        if !self.has_weights() {
            return None;
        }
        Some(
            self.holdings
                .iter()
                .map(|h| h.value / self.total_value)
                .sum(),
        )
    }

    pub fn get(&self, identifier: &str) -> Option<&Holding> {
        self.holdings
            .binary_search_by(|h| h.identifier.as_str().cmp(identifier))
            .ok()
            .map(|i| &self.holdings[i])
    }
}

pub fn weight(value: f64, total_value: f64) -> Option<f64> {
    if total_value > 0.0 {
        Some(value / total_value)
    } else {
        None
    }
}
