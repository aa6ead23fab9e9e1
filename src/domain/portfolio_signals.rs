//! Fund-level signals that span many identifiers.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::cluster::known_label;
use crate::domain::config::EngineConfig;
use crate::domain::diff::{BoundaryDiff, DeltaKind};
use crate::domain::quarter::Quarter;
use crate::domain::signals::Confidence;
use crate::domain::starter::is_starter;
use crate::ports::cluster_port::ClusterLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Increased,
    Decreased,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortfolioSignalKind {
    /// Top-5 concentration moved between the oldest and newest boundary.
    ConcentrationShift {
        direction: ShiftDirection,
        from_level: f64,
        to_level: f64,
        change: f64,
    },
    /// Several new starters opened in one cluster in the same quarter.
    ThemeEmergence { cluster: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSignal {
    pub kind: PortfolioSignalKind,
    pub start: Quarter,
    pub end: Quarter,
    pub confidence: Confidence,
    /// Identifiers behind the signal, ascending. Empty for concentration shifts.
    pub identifiers: Vec<String>,
}

/// Compares top-5 concentration after the oldest and the newest boundary.
/// Needs two boundaries with weights on their later side.
pub fn concentration_shift(diffs: &[BoundaryDiff], config: &EngineConfig) -> Option<PortfolioSignal> {
    let (oldest, newest) = match diffs {
        [oldest, .., newest] => (oldest, newest),
        _ => return None,
    };
    if oldest.total_now <= 0.0 || newest.total_now <= 0.0 {
        return None;
    }

    let from_level = oldest.stats.concentration_top5;
    let to_level = newest.stats.concentration_top5;
    let change = (to_level - from_level).abs();
    if change < config.concentration_shift_min {
        return None;
    }

    let direction = if to_level > from_level {
        ShiftDirection::Increased
    } else {
        ShiftDirection::Decreased
    };
    let confidence = if change >= config.concentration_shift_strong {
        Confidence::Strong
    } else {
        Confidence::Moderate
    };
    Some(PortfolioSignal {
        kind: PortfolioSignalKind::ConcentrationShift {
            direction,
            from_level,
            to_level,
            change,
        },
        start: oldest.to,
        end: newest.to,
        confidence,
        identifiers: Vec::new(),
    })
}

/// Clusters that received at least `theme_min_starters` new starter
/// positions at one boundary. Unclassified openings never form a theme.
pub fn detect_themes(
    diffs: &[BoundaryDiff],
    config: &EngineConfig,
    lookup: &dyn ClusterLookup,
) -> Vec<PortfolioSignal> {
    let mut themes = Vec::new();
    for diff in diffs {
        let mut by_cluster: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for delta in diff.of_kind(DeltaKind::New) {
            let value = delta.now_value.unwrap_or(0.0);
            if !is_starter(delta.now_weight, value, config) {
                continue;
            }
            if let Some(label) = known_label(lookup, &delta.identifier, &delta.issuer_label) {
                by_cluster
                    .entry(label)
                    .or_default()
                    .push(delta.identifier.clone());
            }
        }

        for (cluster, identifiers) in by_cluster {
            if identifiers.len() < config.theme_min_starters {
                continue;
            }
            let confidence = if identifiers.len() >= config.theme_strong_starters {
                Confidence::Strong
            } else {
                Confidence::Moderate
            };
            debug!(quarter = %diff.to, %cluster, starters = identifiers.len(), "theme emergence");
            themes.push(PortfolioSignal {
                kind: PortfolioSignalKind::ThemeEmergence { cluster },
                start: diff.to,
                end: diff.to,
                confidence,
                identifiers,
            });
        }
    }
    themes
}

/// Concentration shift first, then themes oldest quarter first.
pub fn detect_portfolio_signals(
    diffs: &[BoundaryDiff],
    config: &EngineConfig,
    lookup: &dyn ClusterLookup,
) -> Vec<PortfolioSignal> {
    let mut signals: Vec<PortfolioSignal> = concentration_shift(diffs, config).into_iter().collect();
    signals.extend(detect_themes(diffs, config, lookup));
    signals
}
