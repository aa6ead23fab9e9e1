//! Quarter-over-quarter diff engine.
//!
//! Classifies every identifier present on either side of a quarter boundary
//! and provides the deterministic rankings used by report builders.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::domain::aligner::{Alignment, PositionPoint};
use crate::domain::config::EngineConfig;
use crate::domain::quarter::Quarter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    New,
    Exited,
    Increased,
    Decreased,
    Unchanged,
}

impl DeltaKind {
    /// The classification seen when the same boundary is read backwards.
    pub fn reversed(self) -> Self {
        match self {
            DeltaKind::New => DeltaKind::Exited,
            DeltaKind::Exited => DeltaKind::New,
            DeltaKind::Increased => DeltaKind::Decreased,
            DeltaKind::Decreased => DeltaKind::Increased,
            DeltaKind::Unchanged => DeltaKind::Unchanged,
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(self, DeltaKind::New | DeltaKind::Increased)
    }

    pub fn is_sell(self) -> bool {
        matches!(self, DeltaKind::Exited | DeltaKind::Decreased)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub identifier: String,
    pub issuer_label: String,
    pub from: Quarter,
    pub to: Quarter,
    pub kind: DeltaKind,
    pub prev_value: Option<f64>,
    pub now_value: Option<f64>,
    pub value_change: f64,
    pub prev_shares: Option<u64>,
    pub now_shares: Option<u64>,
    pub share_change: i64,
    pub prev_weight: Option<f64>,
    pub now_weight: Option<f64>,
    /// `None` when either side of the boundary has no defined weights.
    pub weight_change: Option<f64>,
    /// `(now - prev) / prev`; `None` without a positive base or for exits.
    pub percent_change: Option<f64>,
    /// Value change as a fraction of the later quarter's total.
    pub portfolio_impact: Option<f64>,
}

/// Portfolio-level diagnostics for the later quarter of a boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryStats {
    pub position_count_prev: usize,
    pub position_count_now: usize,
    pub concentration_top5: f64,
    pub concentration_top10: f64,
    pub herfindahl_index: f64,
    pub gross_adds_value: f64,
    pub gross_cuts_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryDiff {
    pub from: Quarter,
    pub to: Quarter,
    pub contiguous: bool,
    /// False when either quarter has a zero total; classification then used
    /// value changes only.
    pub weights_available: bool,
    pub total_prev: f64,
    pub total_now: f64,
    /// Ordered by identifier.
    pub deltas: Vec<Delta>,
    pub stats: BoundaryStats,
}

impl BoundaryDiff {
    pub fn delta_for(&self, identifier: &str) -> Option<&Delta> {
        self.deltas
            .binary_search_by(|d| d.identifier.as_str().cmp(identifier))
            .ok()
            .map(|i| &self.deltas[i])
    }

    pub fn of_kind(&self, kind: DeltaKind) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(move |d| d.kind == kind)
    }
}

/// Sign-independent significance test for a held-both-sides position.
fn is_significant(value_change: f64, weight_change: Option<f64>, config: &EngineConfig) -> bool {
    let value_ok = value_change.abs() >= config.min_value_change;
    match weight_change {
        Some(w) => value_ok && w.abs() >= config.min_weight_change,
        None => value_ok,
    }
}

/// Classifies one identifier across a boundary. Returns `None` when it is
/// absent on both sides.
pub fn classify(
    prev: Option<&PositionPoint>,
    now: Option<&PositionPoint>,
    weights_available: bool,
    config: &EngineConfig,
) -> Option<DeltaKind> {
    match (prev, now) {
        (None, None) => None,
        (None, Some(_)) => Some(DeltaKind::New),
        (Some(_), None) => Some(DeltaKind::Exited),
        (Some(p), Some(n)) => {
            let value_change = n.value - p.value;
            let weight_change = if weights_available {
                n.weight.zip(p.weight).map(|(nw, pw)| nw - pw)
            } else {
                None
            };
            if !is_significant(value_change, weight_change, config) {
                Some(DeltaKind::Unchanged)
            } else if value_change > 0.0 {
                Some(DeltaKind::Increased)
            } else if value_change < 0.0 {
                Some(DeltaKind::Decreased)
            } else {
                Some(DeltaKind::Unchanged)
            }
        }
    }
}

/// Diffs the quarters on either side of `boundary` (`quarters[boundary]` to
/// `quarters[boundary + 1]`).
pub fn diff_boundary(alignment: &Alignment, boundary: usize, config: &EngineConfig) -> BoundaryDiff {
    let (prev_idx, now_idx) = (boundary, boundary + 1);
    let from = alignment.quarters[prev_idx];
    let to = alignment.quarters[now_idx];
    let total_prev = alignment.totals[prev_idx];
    let total_now = alignment.totals[now_idx];
    let weights_available = total_prev > 0.0 && total_now > 0.0;

    let mut deltas = Vec::new();
    for series in alignment.series.values() {
        let prev = series.at(prev_idx);
        let now = series.at(now_idx);
        let Some(kind) = classify(prev, now, weights_available, config) else {
            continue;
        };

        let prev_value = prev.map(|p| p.value);
        let now_value = now.map(|n| n.value);
        let value_change = now_value.unwrap_or(0.0) - prev_value.unwrap_or(0.0);
        let prev_shares = prev.map(|p| p.shares);
        let now_shares = now.map(|n| n.shares);
        let share_change = now_shares.unwrap_or(0) as i64 - prev_shares.unwrap_or(0) as i64;

        let prev_weight = prev.and_then(|p| p.weight);
        let now_weight = now.and_then(|n| n.weight);
        let weight_change = if weights_available {
            Some(now_weight.unwrap_or(0.0) - prev_weight.unwrap_or(0.0))
        } else {
            None
        };

        let percent_change = match (prev_value, now_value) {
            (Some(p), Some(n)) if p > 0.0 => Some((n - p) / p),
            _ => None,
        };
        let portfolio_impact = if total_now > 0.0 {
            Some(value_change / total_now)
        } else {
            None
        };

        deltas.push(Delta {
            identifier: series.identifier.clone(),
            issuer_label: series.issuer_label.clone(),
            from,
            to,
            kind,
            prev_value,
            now_value,
            value_change,
            prev_shares,
            now_shares,
            share_change,
            prev_weight,
            now_weight,
            weight_change,
            percent_change,
            portfolio_impact,
        });
    }

    let stats = boundary_stats(alignment, prev_idx, now_idx, &deltas);
    debug!(
        fund = %alignment.fund_id,
        %from,
        %to,
        deltas = deltas.len(),
        "diffed boundary"
    );

    BoundaryDiff {
        from,
        to,
        contiguous: alignment.is_contiguous(boundary),
        weights_available,
        total_prev,
        total_now,
        deltas,
        stats,
    }
}

/// Diffs every adjacent pair of quarters, oldest first.
pub fn diff_all(alignment: &Alignment, config: &EngineConfig) -> Vec<BoundaryDiff> {
    (0..alignment.boundary_count())
        .map(|b| diff_boundary(alignment, b, config))
        .collect()
}

fn boundary_stats(
    alignment: &Alignment,
    prev_idx: usize,
    now_idx: usize,
    deltas: &[Delta],
) -> BoundaryStats {
    let total_now = alignment.totals[now_idx];
    let values_now = alignment.holding_values(now_idx);
    let mut weights_now: Vec<f64> = if total_now > 0.0 {
        values_now.iter().map(|v| v / total_now).collect()
    } else {
        Vec::new()
    };
    weights_now.sort_by(|a, b| b.total_cmp(a));

    let top = |n: usize| weights_now.iter().take(n).sum::<f64>();

    BoundaryStats {
        position_count_prev: alignment.holding_values(prev_idx).len(),
        position_count_now: values_now.len(),
        concentration_top5: top(5),
        concentration_top10: top(10),
        herfindahl_index: weights_now.iter().map(|w| w * w).sum(),
        gross_adds_value: deltas
            .iter()
            .filter(|d| d.value_change > 0.0)
            .map(|d| d.value_change)
            .sum(),
        gross_cuts_value: deltas
            .iter()
            .filter(|d| d.value_change < 0.0)
            .map(|d| d.value_change.abs())
            .sum(),
    }
}

/// Ordering used by [`rank`], [`top_adds`] and [`top_cuts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Absolute dollar change.
    ValueChange,
    /// Percent growth relative to the prior value.
    GrowthRate,
    /// Change relative to the later quarter's total portfolio.
    PortfolioImpact,
}

impl Ranking {
    fn metric(self, delta: &Delta) -> Option<f64> {
        match self {
            Ranking::ValueChange => Some(delta.value_change),
            Ranking::GrowthRate => delta.percent_change,
            Ranking::PortfolioImpact => delta.portfolio_impact,
        }
    }
}

/// Descending by `key`, undefined keys last, ties by identifier ascending.
fn sort_desc_by(deltas: &mut [&Delta], key: impl Fn(&Delta) -> Option<f64>) {
    deltas.sort_by(|a, b| {
        let ordering = match (key(*a), key(*b)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        ordering.then_with(|| a.identifier.cmp(&b.identifier))
    });
}

/// Ranks a delta set. Dollar change and portfolio impact rank by magnitude;
/// growth rate ranks by signed value so the fastest growers lead.
pub fn rank(deltas: &[Delta], ranking: Ranking) -> Vec<&Delta> {
    let mut ranked: Vec<&Delta> = deltas.iter().collect();
    match ranking {
        Ranking::ValueChange | Ranking::PortfolioImpact => {
            sort_desc_by(&mut ranked, |d| ranking.metric(d).map(f64::abs))
        }
        Ranking::GrowthRate => sort_desc_by(&mut ranked, |d| ranking.metric(d)),
    }
    ranked
}

/// The `limit` largest adds. New positions have no growth base and are left
/// out of growth-rate rankings.
pub fn top_adds(deltas: &[Delta], ranking: Ranking, limit: usize) -> Vec<&Delta> {
    let mut adds: Vec<&Delta> = deltas
        .iter()
        .filter(|d| d.value_change > 0.0)
        .filter(|d| ranking.metric(d).is_some())
        .filter(|d| !(ranking == Ranking::GrowthRate && d.kind == DeltaKind::New))
        .collect();
    sort_desc_by(&mut adds, |d| ranking.metric(d));
    adds.truncate(limit);
    adds
}

/// The `limit` largest cuts, most negative first.
pub fn top_cuts(deltas: &[Delta], ranking: Ranking, limit: usize) -> Vec<&Delta> {
    let mut cuts: Vec<&Delta> = deltas
        .iter()
        .filter(|d| d.value_change < 0.0)
        .filter(|d| ranking.metric(d).is_some())
        .collect();
    sort_desc_by(&mut cuts, |d| ranking.metric(d).map(|m| -m));
    cuts.truncate(limit);
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aligner::align;
    use crate::domain::snapshot::{Holding, Snapshot};
    use approx::assert_relative_eq;

    fn q(s: &str) -> Quarter {
        s.parse().unwrap()
    }

    fn two_quarters(prev: Vec<Holding>, now: Vec<Holding>) -> Alignment {
        align(&[
            Snapshot::from_holdings("FUND", q("2024Q1"), prev),
            Snapshot::from_holdings("FUND", q("2024Q2"), now),
        ])
        .unwrap()
    }

    fn kind_of(diff: &BoundaryDiff, id: &str) -> DeltaKind {
        diff.delta_for(id).unwrap().kind
    }

    #[test]
    fn classifies_every_kind() {
        let alignment = two_quarters(
            vec![
                Holding::new("EXIT", "Exit Co", 100, 1_000_000.0),
                Holding::new("UP", "Up Co", 100, 1_000_000.0),
                Holding::new("DOWN", "Down Co", 100, 1_000_000.0),
                Holding::new("FLAT", "Flat Co", 100, 1_000_000.0),
            ],
            vec![
                Holding::new("NEW", "New Co", 100, 1_000_000.0),
                Holding::new("UP", "Up Co", 200, 2_000_000.0),
                Holding::new("DOWN", "Down Co", 50, 500_000.0),
                Holding::new("FLAT", "Flat Co", 100, 1_000_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());

        assert_eq!(diff.deltas.len(), 5);
        assert_eq!(kind_of(&diff, "NEW"), DeltaKind::New);
        assert_eq!(kind_of(&diff, "EXIT"), DeltaKind::Exited);
        assert_eq!(kind_of(&diff, "UP"), DeltaKind::Increased);
        assert_eq!(kind_of(&diff, "DOWN"), DeltaKind::Decreased);
        assert_eq!(kind_of(&diff, "FLAT"), DeltaKind::Unchanged);
        assert!(diff.contiguous);
        assert!(diff.weights_available);
    }

    #[test]
    fn delta_measures() {
        let alignment = two_quarters(
            vec![
                Holding::new("A", "Alpha", 100, 1_000_000.0),
                Holding::new("B", "Bravo", 100, 3_000_000.0),
            ],
            vec![
                Holding::new("A", "Alpha", 150, 1_500_000.0),
                Holding::new("B", "Bravo", 100, 3_500_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        let a = diff.delta_for("A").unwrap();

        assert_relative_eq!(a.value_change, 500_000.0);
        assert_eq!(a.share_change, 50);
        assert_relative_eq!(a.percent_change.unwrap(), 0.5);
        assert_relative_eq!(a.portfolio_impact.unwrap(), 0.1);
        assert_relative_eq!(a.prev_weight.unwrap(), 0.25);
        assert_relative_eq!(a.now_weight.unwrap(), 0.3);
        assert_relative_eq!(a.weight_change.unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn new_position_has_no_percent_change() {
        let alignment = two_quarters(
            vec![Holding::new("A", "Alpha", 1, 100_000.0)],
            vec![
                Holding::new("A", "Alpha", 1, 100_000.0),
                Holding::new("B", "Bravo", 1, 100_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        let b = diff.delta_for("B").unwrap();
        assert_eq!(b.kind, DeltaKind::New);
        assert_eq!(b.percent_change, None);
        assert_eq!(b.prev_weight, None);
        assert_relative_eq!(b.weight_change.unwrap(), 0.5);
    }

    #[test]
    fn exit_has_no_percent_change() {
        let alignment = two_quarters(
            vec![
                Holding::new("A", "Alpha", 1, 100_000.0),
                Holding::new("B", "Bravo", 1, 100_000.0),
            ],
            vec![Holding::new("A", "Alpha", 1, 100_000.0)],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        let b = diff.delta_for("B").unwrap();
        assert_eq!(b.kind, DeltaKind::Exited);
        assert_eq!(b.percent_change, None);
        assert_relative_eq!(b.value_change, -100_000.0);
    }

    #[test]
    fn value_floor_suppresses_rounding_noise() {
        let alignment = two_quarters(
            vec![
                Holding::new("A", "Alpha", 1, 10_000.0),
                Holding::new("B", "Bravo", 1, 10_000.0),
            ],
            vec![
                Holding::new("A", "Alpha", 1, 10_500.0),
                Holding::new("B", "Bravo", 1, 10_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        // Weight moved well past 0.01pp but the dollar change is under the floor.
        assert_eq!(kind_of(&diff, "A"), DeltaKind::Unchanged);
    }

    #[test]
    fn weight_floor_suppresses_proportional_moves() {
        // Whole portfolio doubles: dollar change is large but weight is unchanged.
        let alignment = two_quarters(
            vec![
                Holding::new("A", "Alpha", 1, 1_000_000.0),
                Holding::new("B", "Bravo", 1, 1_000_000.0),
            ],
            vec![
                Holding::new("A", "Alpha", 1, 2_000_000.0),
                Holding::new("B", "Bravo", 1, 2_000_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        assert_eq!(kind_of(&diff, "A"), DeltaKind::Unchanged);
        assert_eq!(kind_of(&diff, "B"), DeltaKind::Unchanged);
    }

    #[test]
    fn zero_total_falls_back_to_value() {
        let alignment = align(&[
            Snapshot::new("FUND", q("2024Q1"), 0.0, vec![Holding::new("A", "Alpha", 1, 10_000.0)]),
            Snapshot::from_holdings("FUND", q("2024Q2"), vec![Holding::new("A", "Alpha", 1, 50_000.0)]),
        ])
        .unwrap();
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        assert!(!diff.weights_available);
        let a = diff.delta_for("A").unwrap();
        assert_eq!(a.kind, DeltaKind::Increased);
        assert_eq!(a.weight_change, None);
    }

    #[test]
    fn absent_both_sides_gets_no_delta() {
        let alignment = align(&[
            Snapshot::from_holdings("FUND", q("2024Q1"), vec![Holding::new("A", "Alpha", 1, 1.0)]),
            Snapshot::from_holdings("FUND", q("2024Q2"), vec![Holding::new("B", "Bravo", 1, 1.0)]),
            Snapshot::from_holdings("FUND", q("2024Q3"), vec![Holding::new("B", "Bravo", 1, 1.0)]),
        ])
        .unwrap();
        let diffs = diff_all(&alignment, &EngineConfig::default());
        assert_eq!(diffs.len(), 2);
        assert!(diffs[1].delta_for("A").is_none());
    }

    #[test]
    fn reversed_kinds_pair_up() {
        assert_eq!(DeltaKind::New.reversed(), DeltaKind::Exited);
        assert_eq!(DeltaKind::Increased.reversed(), DeltaKind::Decreased);
        assert_eq!(DeltaKind::Unchanged.reversed(), DeltaKind::Unchanged);
    }

    #[test]
    fn boundary_stats_concentration() {
        let alignment = two_quarters(
            vec![Holding::new("A", "Alpha", 1, 1_000_000.0)],
            vec![
                Holding::new("A", "Alpha", 1, 600_000.0),
                Holding::new("B", "Bravo", 1, 400_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        assert_eq!(diff.stats.position_count_prev, 1);
        assert_eq!(diff.stats.position_count_now, 2);
        assert_relative_eq!(diff.stats.concentration_top5, 1.0);
        assert_relative_eq!(diff.stats.herfindahl_index, 0.36 + 0.16, epsilon = 1e-12);
        assert_relative_eq!(diff.stats.gross_adds_value, 400_000.0);
        assert_relative_eq!(diff.stats.gross_cuts_value, 400_000.0);
    }

    #[test]
    fn boundary_stats_include_unresolved_holdings() {
        let alignment = two_quarters(
            vec![Holding::new("A", "Alpha", 1, 1_000_000.0)],
            vec![
                Holding::new("A", "Alpha", 1, 500_000.0),
                Holding::new("", "UNLISTED WARRANT", 1, 300_000.0),
                Holding::new("", "PRIVATE NOTE", 1, 200_000.0),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        assert_eq!(diff.stats.position_count_prev, 1);
        assert_eq!(diff.stats.position_count_now, 3);
        assert_relative_eq!(diff.stats.concentration_top5, 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            diff.stats.herfindahl_index,
            0.25 + 0.09 + 0.04,
            epsilon = 1e-12
        );
    }

    fn ranking_fixture() -> BoundaryDiff {
        let alignment = two_quarters(
            vec![
                Holding::new("A", "Alpha", 1, 1_000_000.0),
                Holding::new("B", "Bravo", 1, 4_000_000.0),
                Holding::new("C", "Charlie", 1, 2_000_000.0),
                Holding::new("D", "Delta", 1, 3_000_000.0),
            ],
            vec![
                Holding::new("A", "Alpha", 1, 3_000_000.0),
                Holding::new("B", "Bravo", 1, 6_000_000.0),
                Holding::new("C", "Charlie", 1, 1_000_000.0),
                Holding::new("E", "Echo", 1, 2_000_000.0),
            ],
        );
        diff_boundary(&alignment, 0, &EngineConfig::default())
    }

    fn ids(deltas: &[&Delta]) -> Vec<String> {
        deltas.iter().map(|d| d.identifier.clone()).collect()
    }

    #[test]
    fn rank_by_value_breaks_ties_by_identifier() {
        let diff = ranking_fixture();
        // A +2M, B +2M, E +2M, D -3M, C -1M
        let ranked = rank(&diff.deltas, Ranking::ValueChange);
        assert_eq!(ids(&ranked), vec!["D", "A", "B", "E", "C"]);
    }

    #[test]
    fn rank_by_growth_puts_undefined_last() {
        let diff = ranking_fixture();
        // A +200%, B +50%, C -50%, D exited and E new are undefined
        let ranked = rank(&diff.deltas, Ranking::GrowthRate);
        assert_eq!(ids(&ranked), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn rank_by_impact_uses_magnitude() {
        let diff = ranking_fixture();
        let ranked = rank(&diff.deltas, Ranking::PortfolioImpact);
        assert_eq!(ids(&ranked), vec!["D", "A", "B", "E", "C"]);
    }

    #[test]
    fn top_adds_and_cuts() {
        let diff = ranking_fixture();
        assert_eq!(ids(&top_adds(&diff.deltas, Ranking::ValueChange, 2)), vec!["A", "B"]);
        assert_eq!(ids(&top_adds(&diff.deltas, Ranking::GrowthRate, 10)), vec!["A", "B"]);
        assert_eq!(ids(&top_cuts(&diff.deltas, Ranking::ValueChange, 10)), vec!["D", "C"]);
        assert_eq!(ids(&top_cuts(&diff.deltas, Ranking::GrowthRate, 10)), vec!["C"]);
    }

    #[test]
    fn growth_cuts_skip_full_exits() {
        let alignment = two_quarters(
            vec![
                Holding::new("CORE", "Core Co", 1, 1e9),
                Holding::new("EXIT", "Exit Co", 1, 1e7),
                Holding::new("TRIM", "Trim Co", 1, 1e7),
            ],
            vec![
                Holding::new("CORE", "Core Co", 1, 1e9),
                Holding::new("TRIM", "Trim Co", 1, 5e6),
            ],
        );
        let diff = diff_boundary(&alignment, 0, &EngineConfig::default());
        assert_eq!(kind_of(&diff, "EXIT"), DeltaKind::Exited);
        assert_eq!(ids(&top_cuts(&diff.deltas, Ranking::GrowthRate, 5)), vec!["TRIM"]);
        assert_eq!(ids(&top_cuts(&diff.deltas, Ranking::ValueChange, 5)), vec!["EXIT", "TRIM"]);
    }
}
