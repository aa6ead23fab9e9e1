//! Starter positions and their progression to scale.

use serde::Serialize;

use crate::domain::aligner::{Alignment, PositionSeries};
use crate::domain::config::EngineConfig;
use crate::domain::diff::{BoundaryDiff, DeltaKind};
use crate::domain::quarter::Quarter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StarterOutcome {
    /// Still held and still below the scale threshold.
    Open,
    Scaled,
    /// Sold before it ever scaled.
    Exited,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarterFlag {
    pub identifier: String,
    pub issuer_label: String,
    pub flagged: Quarter,
    pub value: f64,
    pub weight: Option<f64>,
    pub scaled: Option<Quarter>,
    pub exited: Option<Quarter>,
    pub outcome: StarterOutcome,
}

/// Weight inside the starter band, or value under the ceiling.
pub fn is_starter(weight: Option<f64>, value: f64, config: &EngineConfig) -> bool {
    let in_band = weight
        .is_some_and(|w| w >= config.starter_weight_min && w <= config.starter_weight_max);
    in_band || value < config.starter_value_ceiling
}

/// Weight above the scale threshold, or value above the scale value.
pub fn has_scaled(weight: Option<f64>, value: f64, config: &EngineConfig) -> bool {
    weight.is_some_and(|w| w > config.scale_weight_threshold) || value > config.scale_value_threshold
}

/// Flags every opening of a position (held in the earliest quarter, or
/// newly opened later) that met the starter criteria, and follows it until
/// it scales or is sold.
pub fn classify_starters(alignment: &Alignment, config: &EngineConfig) -> Vec<StarterFlag> {
    alignment
        .series
        .values()
        .flat_map(|series| series_starters(alignment, series, config))
        .collect()
}

fn series_starters(
    alignment: &Alignment,
    series: &PositionSeries,
    config: &EngineConfig,
) -> Vec<StarterFlag> {
    let points = series.points();
    let mut flags = Vec::new();

    for (open_idx, point) in points.iter().enumerate() {
        let Some(point) = point else { continue };
        let is_opening = open_idx == 0 || points[open_idx - 1].is_none();
        if !is_opening || !is_starter(point.weight, point.value, config) {
            continue;
        }

        let mut scaled = None;
        let mut exited = None;
        for (idx, later) in points.iter().enumerate().skip(open_idx + 1) {
            match later {
                None => {
                    exited = Some(alignment.quarters[idx]);
                    break;
                }
                Some(p) => {
                    if scaled.is_none() && has_scaled(p.weight, p.value, config) {
                        scaled = Some(alignment.quarters[idx]);
                    }
                }
            }
        }

        let outcome = match (scaled, exited) {
            (Some(_), _) => StarterOutcome::Scaled,
            (None, Some(_)) => StarterOutcome::Exited,
            (None, None) => StarterOutcome::Open,
        };

        flags.push(StarterFlag {
            identifier: series.identifier.clone(),
            issuer_label: series.issuer_label.clone(),
            flagged: alignment.quarters[open_idx],
            value: point.value,
            weight: point.weight,
            scaled,
            exited,
            outcome,
        });
    }
    flags
}

/// An increased position that is still starter-sized but grew fast enough
/// to signal conviction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleUp {
    pub identifier: String,
    pub issuer_label: String,
    pub from: Quarter,
    pub to: Quarter,
    pub value: f64,
    pub weight: Option<f64>,
    pub percent_change: Option<f64>,
    pub portfolio_impact: Option<f64>,
}

/// Increased starters at every boundary whose growth reaches
/// `scale_up_min_growth` or whose portfolio impact reaches
/// `scale_up_min_impact`. Oldest boundary first.
pub fn scale_ups(diffs: &[BoundaryDiff], config: &EngineConfig) -> Vec<ScaleUp> {
    diffs
        .iter()
        .flat_map(|diff| diff.of_kind(DeltaKind::Increased))
        .filter_map(|d| {
            let value = d.now_value?;
            if !is_starter(d.now_weight, value, config) {
                return None;
            }
            let grew = d.percent_change.is_some_and(|p| p >= config.scale_up_min_growth);
            let moved = d
                .portfolio_impact
                .is_some_and(|i| i >= config.scale_up_min_impact);
            (grew || moved).then(|| ScaleUp {
                identifier: d.identifier.clone(),
                issuer_label: d.issuer_label.clone(),
                from: d.from,
                to: d.to,
                value,
                weight: d.now_weight,
                percent_change: d.percent_change,
                portfolio_impact: d.portfolio_impact,
            })
        })
        .collect()
}

/// Year-to-date starter→scale summary: starters that crossed the scale
/// threshold during `year`.
pub fn scaled_in_year(flags: &[StarterFlag], year: i32) -> Vec<&StarterFlag> {
    flags
        .iter()
        .filter(|f| f.scaled.is_some_and(|q| q.year() == year))
        .collect()
}
