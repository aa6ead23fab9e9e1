//! Per-fund analysis pipeline.
//!
//! Aligner → diff engine → {signals, starters, clusters}. Each fund is
//! independent, so [`analyze_funds`] fans out across threads; the universe
//! comparison runs once every result is in.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::aligner::align;
use crate::domain::cluster::{ClusterAggregate, assign_clusters, summarize_clusters};
use crate::domain::config::EngineConfig;
use crate::domain::diff::{BoundaryDiff, BoundaryStats, Delta, diff_all};
use crate::domain::error::EngineError;
use crate::domain::quarter::Quarter;
use crate::domain::portfolio_signals::{PortfolioSignal, detect_portfolio_signals};
use crate::domain::signals::{Signal, detect_all};
use crate::domain::snapshot::Snapshot;
use crate::domain::starter::{ScaleUp, StarterFlag, classify_starters, scale_ups};
use crate::ports::cluster_port::ClusterLookup;

/// A data-quality problem that did not stop the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataWarning {
    ZeroTotalValue { quarter: Quarter },
    WeightSumDeviation { quarter: Quarter, weight_sum: f64 },
    SequenceBreak { after: Quarter, before: Quarter },
    WeightUnavailable { from: Quarter, to: Quarter },
    UnresolvedHoldings { count: usize },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::ZeroTotalValue { quarter } => {
                write!(f, "{quarter}: total value is zero, weights undefined")
            }
            DataWarning::WeightSumDeviation {
                quarter,
                weight_sum,
            } => write!(f, "{quarter}: weights sum to {weight_sum:.4}"),
            DataWarning::SequenceBreak { after, before } => {
                write!(f, "no snapshot between {after} and {before}")
            }
            DataWarning::WeightUnavailable { from, to } => {
                write!(f, "{from}->{to}: classified on value only")
            }
            DataWarning::UnresolvedHoldings { count } => {
                write!(f, "{count} holdings without identifier")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundarySummary {
    pub from: Quarter,
    pub to: Quarter,
    pub contiguous: bool,
    pub weights_available: bool,
    pub total_prev: f64,
    pub total_now: f64,
    pub stats: BoundaryStats,
}

impl From<&BoundaryDiff> for BoundarySummary {
    fn from(diff: &BoundaryDiff) -> Self {
        BoundarySummary {
            from: diff.from,
            to: diff.to,
            contiguous: diff.contiguous,
            weights_available: diff.weights_available,
            total_prev: diff.total_prev,
            total_now: diff.total_now,
            stats: diff.stats.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub fund_id: String,
    pub quarter_range: (Quarter, Quarter),
    pub quarters: Vec<Quarter>,
    pub boundaries: Vec<BoundarySummary>,
    /// Oldest boundary first, identifier order within a boundary.
    pub deltas: Vec<Delta>,
    pub signals: Vec<Signal>,
    /// Concentration shifts and theme emergence.
    pub portfolio_signals: Vec<PortfolioSignal>,
    pub starters: Vec<StarterFlag>,
    pub scale_ups: Vec<ScaleUp>,
    /// Latest quarter's identifier → cluster label.
    pub cluster_assignments: BTreeMap<String, String>,
    /// Latest quarter's exposure, with change against the quarter before it.
    pub cluster_summary: BTreeMap<String, ClusterAggregate>,
    pub unresolved: Vec<String>,
    pub warnings: Vec<DataWarning>,
}

impl AnalysisResult {
    /// Deltas for the boundary ending in `quarter`.
    pub fn deltas_into(&self, quarter: Quarter) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(move |d| d.to == quarter)
    }
}

/// Data-quality checks on a single snapshot.
pub fn check_snapshot(snapshot: &Snapshot, config: &EngineConfig) -> Vec<DataWarning> {
    match snapshot.weight_sum() {
        None => vec![DataWarning::ZeroTotalValue {
            quarter: snapshot.quarter,
        }],
        Some(sum) if (sum - 1.0).abs() > config.weight_sum_tolerance => {
            vec![DataWarning::WeightSumDeviation {
                quarter: snapshot.quarter,
                weight_sum: sum,
            }]
        }
        Some(_) => Vec::new(),
    }
}

/// Runs the full per-fund pipeline over `snapshots` (oldest first).
pub fn analyze_fund(
    snapshots: &[Snapshot],
    config: &EngineConfig,
    lookup: &dyn ClusterLookup,
) -> Result<AnalysisResult, EngineError> {
    config.validate()?;
    let alignment = align(snapshots)?;

    let mut warnings: Vec<DataWarning> = snapshots
        .iter()
        .flat_map(|s| check_snapshot(s, config))
        .collect();
    warnings.extend(alignment.breaks.iter().map(|b| DataWarning::SequenceBreak {
        after: b.after,
        before: b.before,
    }));

    let diffs = diff_all(&alignment, config);
    warnings.extend(
        diffs
            .iter()
            .filter(|d| !d.weights_available)
            .map(|d| DataWarning::WeightUnavailable {
                from: d.from,
                to: d.to,
            }),
    );
    let unresolved_count = alignment.unresolved_holding_count();
    if unresolved_count > 0 {
        warnings.push(DataWarning::UnresolvedHoldings {
            count: unresolved_count,
        });
    }
    for warning in &warnings {
        warn!(fund = %alignment.fund_id, "{warning}");
    }

    let signals = detect_all(&alignment, &diffs, config);
    let portfolio_signals = detect_portfolio_signals(&diffs, config, lookup);
    let starters = classify_starters(&alignment, config);
    let scale_ups = scale_ups(&diffs, config);

    let latest = &snapshots[snapshots.len() - 1];
    let prior = snapshots.len().checked_sub(2).map(|i| &snapshots[i]);
    let cluster_assignments = assign_clusters(latest, lookup);
    let cluster_summary = summarize_clusters(latest, prior, lookup);

    let boundaries = diffs.iter().map(BoundarySummary::from).collect();
    let deltas = diffs.into_iter().flat_map(|d| d.deltas).collect::<Vec<_>>();

    info!(
        fund = %alignment.fund_id,
        from = %alignment.first_quarter(),
        to = %alignment.last_quarter(),
        deltas = deltas.len(),
        signals = signals.len() + portfolio_signals.len(),
        starters = starters.len(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        fund_id: alignment.fund_id.clone(),
        quarter_range: (alignment.first_quarter(), alignment.last_quarter()),
        quarters: alignment.quarters.clone(),
        boundaries,
        deltas,
        signals,
        portfolio_signals,
        starters,
        scale_ups,
        cluster_assignments,
        cluster_summary,
        unresolved: alignment.unresolved,
        warnings,
    })
}

/// Analyzes many funds in parallel. Output order matches input order.
pub fn analyze_funds(
    funds: &[Vec<Snapshot>],
    config: &EngineConfig,
    lookup: &dyn ClusterLookup,
) -> Vec<Result<AnalysisResult, EngineError>> {
    funds
        .par_iter()
        .map(|snapshots| analyze_fund(snapshots, config, lookup))
        .collect()
}
