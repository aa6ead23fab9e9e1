//! Cross-fund comparison for a single quarter.
//!
//! Runs after every participating fund's analysis has finished. Only deltas
//! ending in the target quarter are compared; a fund with no delta for an
//! identifier simply does not take part in that identifier's comparison.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::analysis::AnalysisResult;
use crate::domain::config::EngineConfig;
use crate::domain::diff::{Delta, DeltaKind};
use crate::domain::quarter::Quarter;
use crate::domain::signals::SignalKind;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in fund list")]
    EmptyToken,

    #[error("duplicate fund: {0}")]
    DuplicateFund(String),
}

/// Parses a comma-separated fund list, upper-casing each id.
pub fn parse_fund_ids(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut funds = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let fund = trimmed.to_uppercase();
        if !seen.insert(fund.clone()) {
            return Err(UniverseError::DuplicateFund(fund));
        }
        funds.push(fund);
    }

    Ok(funds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buying,
    Selling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundWeight {
    pub fund_id: String,
    pub value: f64,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundMove {
    pub fund_id: String,
    pub kind: DeltaKind,
    pub value_change: f64,
    /// The fund's own signals on this identifier that end in the target quarter.
    pub signals: Vec<SignalKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapEntry {
    pub identifier: String,
    pub issuer_label: String,
    pub funds: Vec<FundWeight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceEntry {
    pub identifier: String,
    pub issuer_label: String,
    pub buyers: Vec<FundMove>,
    pub sellers: Vec<FundMove>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedMoveEntry {
    pub identifier: String,
    pub issuer_label: String,
    pub direction: Direction,
    pub funds: Vec<FundMove>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniverseResult {
    pub quarter: Quarter,
    /// Funds that contributed deltas for the quarter, in id order.
    pub funds: Vec<String>,
    pub overlap: Vec<OverlapEntry>,
    pub divergence: Vec<DivergenceEntry>,
    pub shared_moves: Vec<SharedMoveEntry>,
}

struct Observation<'a> {
    fund: &'a AnalysisResult,
    delta: &'a Delta,
}

impl Observation<'_> {
    fn to_move(&self, quarter: Quarter) -> FundMove {
        FundMove {
            fund_id: self.fund.fund_id.clone(),
            kind: self.delta.kind,
            value_change: self.delta.value_change,
            signals: self
                .fund
                .signals
                .iter()
                .filter(|s| s.identifier == self.delta.identifier && s.end == quarter)
                .map(|s| s.kind)
                .collect(),
        }
    }
}

/// Compares funds at `quarter`. Funds named in the config's exclusion list
/// are left out; results are ordered by identifier and then fund id.
pub fn compare_universe(
    results: &[AnalysisResult],
    quarter: Quarter,
    config: &EngineConfig,
) -> Result<UniverseResult, UniverseError> {
    let mut participants: Vec<&AnalysisResult> = Vec::new();
    let mut seen = HashSet::new();
    for result in results {
        if !seen.insert(result.fund_id.as_str()) {
            return Err(UniverseError::DuplicateFund(result.fund_id.clone()));
        }
        if config.is_excluded(&result.fund_id) {
            info!(fund = %result.fund_id, "excluded from universe comparison");
            continue;
        }
        participants.push(result);
    }
    participants.sort_by(|a, b| a.fund_id.cmp(&b.fund_id));

    let mut by_identifier: BTreeMap<&str, Vec<Observation>> = BTreeMap::new();
    let mut contributing: Vec<String> = Vec::new();
    for fund in participants.iter().copied() {
        let mut any = false;
        for delta in fund.deltas.iter().filter(|d| d.to == quarter) {
            any = true;
            by_identifier
                .entry(delta.identifier.as_str())
                .or_default()
                .push(Observation { fund, delta });
        }
        if any {
            contributing.push(fund.fund_id.clone());
        } else {
            debug!(fund = %fund.fund_id, %quarter, "no deltas for quarter");
        }
    }

    let mut overlap = Vec::new();
    let mut divergence = Vec::new();
    let mut shared_moves = Vec::new();

    for (identifier, observations) in &by_identifier {
        let issuer_label = observations[0].delta.issuer_label.clone();

        let holders: Vec<FundWeight> = observations
            .iter()
            .filter_map(|o| {
                o.delta.now_value.map(|value| FundWeight {
                    fund_id: o.fund.fund_id.clone(),
                    value,
                    weight: o.delta.now_weight,
                })
            })
            .collect();
        if holders.len() >= 2 {
            overlap.push(OverlapEntry {
                identifier: identifier.to_string(),
                issuer_label: issuer_label.clone(),
                funds: holders,
            });
        }

        let buyers: Vec<FundMove> = observations
            .iter()
            .filter(|o| o.delta.kind.is_buy())
            .map(|o| o.to_move(quarter))
            .collect();
        let sellers: Vec<FundMove> = observations
            .iter()
            .filter(|o| o.delta.kind.is_sell())
            .map(|o| o.to_move(quarter))
            .collect();

        if buyers.len() >= 2 {
            shared_moves.push(SharedMoveEntry {
                identifier: identifier.to_string(),
                issuer_label: issuer_label.clone(),
                direction: Direction::Buying,
                funds: buyers.clone(),
            });
        }
        if sellers.len() >= 2 {
            shared_moves.push(SharedMoveEntry {
                identifier: identifier.to_string(),
                issuer_label: issuer_label.clone(),
                direction: Direction::Selling,
                funds: sellers.clone(),
            });
        }
        if !buyers.is_empty() && !sellers.is_empty() {
            divergence.push(DivergenceEntry {
                identifier: identifier.to_string(),
                issuer_label,
                buyers,
                sellers,
            });
        }
    }

    info!(
        %quarter,
        funds = contributing.len(),
        overlap = overlap.len(),
        divergence = divergence.len(),
        shared = shared_moves.len(),
        "universe comparison complete"
    );

    Ok(UniverseResult {
        quarter,
        funds: contributing,
        overlap,
        divergence,
        shared_moves,
    })
}
