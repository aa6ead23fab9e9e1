//! Position alignment across a fund's quarters.
//!
//! Joins holdings by exact identifier and lays each identifier out over the
//! full quarter range, with `None` where the fund did not hold it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::error::EngineError;
use crate::domain::quarter::Quarter;
use crate::domain::snapshot::Snapshot;

/// One identifier's state in one quarter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionPoint {
    pub shares: u64,
    pub value: f64,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSeries {
    pub identifier: String,
    /// Label from the most recent quarter the position was held.
    pub issuer_label: String,
    points: Vec<Option<PositionPoint>>,
}

impl PositionSeries {
    /// Slot `i` corresponds to `Alignment::quarters[i]`.
    pub fn points(&self) -> &[Option<PositionPoint>] {
        &self.points
    }

    pub fn at(&self, index: usize) -> Option<&PositionPoint> {
        self.points.get(index).and_then(|p| p.as_ref())
    }

    pub fn is_held_at(&self, index: usize) -> bool {
        self.at(index).is_some()
    }

    pub fn quarters_held(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

/// A gap in the quarter sequence: `before` does not immediately follow `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceBreak {
    pub after: Quarter,
    pub before: Quarter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub fund_id: String,
    pub quarters: Vec<Quarter>,
    pub totals: Vec<f64>,
    pub series: BTreeMap<String, PositionSeries>,
    pub breaks: Vec<SequenceBreak>,
    /// Issuer labels of holdings without a usable identifier.
    pub unresolved: Vec<String>,
    /// Values of those holdings, one slot per quarter.
    pub unresolved_values: Vec<Vec<f64>>,
}

impl Alignment {
    /// Unresolved holdings summed over every quarter.
    pub fn unresolved_holding_count(&self) -> usize {
        self.unresolved_values.iter().map(Vec::len).sum()
    }

    /// Every holding's value in quarter `index`, resolved or not.
    pub fn holding_values(&self, index: usize) -> Vec<f64> {
        let resolved = self.series.values().filter_map(|s| s.at(index)).map(|p| p.value);
        let unresolved = self.unresolved_values.get(index).into_iter().flatten().copied();
        resolved.chain(unresolved).collect()
    }

    /// Boundary `i` sits between `quarters[i]` and `quarters[i + 1]`.
    pub fn boundary_count(&self) -> usize {
        self.quarters.len().saturating_sub(1)
    }

    pub fn is_contiguous(&self, boundary: usize) -> bool {
        match (self.quarters.get(boundary), self.quarters.get(boundary + 1)) {
            (Some(from), Some(to)) => to.follows(from),
            _ => false,
        }
    }

    pub fn first_quarter(&self) -> Quarter {
        self.quarters[0]
    }

    pub fn last_quarter(&self) -> Quarter {
        self.quarters[self.quarters.len() - 1]
    }

    pub fn index_of(&self, quarter: Quarter) -> Option<usize> {
        self.quarters.binary_search(&quarter).ok()
    }
}

/// Aligns a fund's snapshots. Quarters must be strictly increasing and all
/// snapshots must belong to the same fund.
pub fn align(snapshots: &[Snapshot]) -> Result<Alignment, EngineError> {
    let first = snapshots.first().ok_or_else(|| EngineError::EmptySeries {
        fund_id: String::new(),
    })?;
    let fund_id = first.fund_id.clone();

    validate_sequence(&fund_id, snapshots)?;

    let quarters: Vec<Quarter> = snapshots.iter().map(|s| s.quarter).collect();
    let totals: Vec<f64> = snapshots.iter().map(|s| s.total_value).collect();
    let slots = snapshots.len();

    let mut series: BTreeMap<String, PositionSeries> = BTreeMap::new();
    let mut unresolved: BTreeSet<String> = BTreeSet::new();
    let mut unresolved_values: Vec<Vec<f64>> = vec![Vec::new(); slots];

    for (index, snapshot) in snapshots.iter().enumerate() {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for holding in &snapshot.holdings {
            if !holding.is_resolved() {
                unresolved.insert(holding.issuer_label.clone());
                unresolved_values[index].push(holding.value);
                continue;
            }
            if !seen.insert(holding.identifier.as_str()) {
                return Err(EngineError::DuplicateHolding {
                    fund_id: fund_id.clone(),
                    quarter: snapshot.quarter.to_string(),
                    identifier: holding.identifier.clone(),
                });
            }

            let entry = series
                .entry(holding.identifier.clone())
                .or_insert_with(|| PositionSeries {
                    identifier: holding.identifier.clone(),
                    issuer_label: holding.issuer_label.clone(),
                    points: vec![None; slots],
                });
            entry.issuer_label = holding.issuer_label.clone();
            entry.points[index] = Some(PositionPoint {
                shares: holding.shares,
                value: holding.value,
                weight: snapshot.weight_of(holding.value),
            });
        }
    }

    let breaks: Vec<SequenceBreak> = quarters
        .windows(2)
        .filter(|w| !w[1].follows(&w[0]))
        .map(|w| SequenceBreak {
            after: w[0],
            before: w[1],
        })
        .collect();

    for gap in &breaks {
        warn!(fund = %fund_id, after = %gap.after, before = %gap.before, "quarter sequence break");
    }
    if !unresolved.is_empty() {
        let count: usize = unresolved_values.iter().map(Vec::len).sum();
        warn!(fund = %fund_id, count, "holdings without identifier excluded");
    }
    debug!(
        fund = %fund_id,
        quarters = quarters.len(),
        identifiers = series.len(),
        "aligned positions"
    );

    Ok(Alignment {
        fund_id,
        quarters,
        totals,
        series,
        breaks,
        unresolved: unresolved.into_iter().collect(),
        unresolved_values,
    })
}

fn validate_sequence(fund_id: &str, snapshots: &[Snapshot]) -> Result<(), EngineError> {
    for snapshot in snapshots {
        if snapshot.fund_id != fund_id {
            return Err(EngineError::FundMismatch {
                expected: fund_id.to_string(),
                found: snapshot.fund_id.clone(),
            });
        }
    }
    for pair in snapshots.windows(2) {
        let (previous, current) = (pair[0].quarter, pair[1].quarter);
        if current == previous {
            return Err(EngineError::DuplicateQuarter {
                fund_id: fund_id.to_string(),
                quarter: current.to_string(),
            });
        }
        if current < previous {
            return Err(EngineError::OutOfOrderQuarter {
                fund_id: fund_id.to_string(),
                previous: previous.to_string(),
                quarter: current.to_string(),
            });
        }
    }
    Ok(())
}
