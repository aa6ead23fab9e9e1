//! Engine thresholds.
//!
//! Every tunable number the analysis uses lives here with its default, so
//! tests can drive boundary values directly.

use serde::Serialize;

use crate::domain::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Minimum absolute weight change (fraction of portfolio) for a move to count.
    pub min_weight_change: f64,
    /// Minimum absolute dollar change for a move to count.
    pub min_value_change: f64,
    pub starter_weight_min: f64,
    pub starter_weight_max: f64,
    /// Positions opened below this value are starters regardless of weight.
    pub starter_value_ceiling: f64,
    /// A starter has scaled once its weight exceeds this...
    pub scale_weight_threshold: f64,
    /// ...or its value exceeds this.
    pub scale_value_threshold: f64,
    /// An increased starter is a scale-up when it grew at least this much
    /// (1.0 = doubled) or moved the portfolio by `scale_up_min_impact`.
    pub scale_up_min_growth: f64,
    pub scale_up_min_impact: f64,
    pub accumulator_moderate_streak: usize,
    pub accumulator_strong_streak: usize,
    pub build_trim_min_streak: usize,
    /// Shortest and longest open-to-close lifetime (in quarters, inclusive)
    /// reported as a probe.
    pub probe_min_span: i64,
    pub probe_max_span: i64,
    /// Top-5 concentration move between the oldest and newest boundary that
    /// counts as a shift, and the move at which the shift is strong.
    pub concentration_shift_min: f64,
    pub concentration_shift_strong: f64,
    /// New starters sharing a cluster in one quarter before a theme is reported.
    pub theme_min_starters: usize,
    pub theme_strong_starters: usize,
    pub weight_sum_tolerance: f64,
    /// Funds left out of universe comparisons (e.g. passive index holders).
    pub universe_exclusions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_weight_change: 0.0001,
            min_value_change: 1_000.0,
            starter_weight_min: 0.0001,
            starter_weight_max: 0.0025,
            starter_value_ceiling: 5_000_000.0,
            scale_weight_threshold: 0.005,
            scale_value_threshold: 20_000_000.0,
            scale_up_min_growth: 1.0,
            scale_up_min_impact: 0.0005,
            accumulator_moderate_streak: 3,
            accumulator_strong_streak: 4,
            build_trim_min_streak: 2,
            probe_min_span: 2,
            probe_max_span: 3,
            concentration_shift_min: 0.05,
            concentration_shift_strong: 0.10,
            theme_min_starters: 3,
            theme_strong_starters: 5,
            weight_sum_tolerance: 0.005,
            universe_exclusions: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let non_negative = [
            ("min_weight_change", self.min_weight_change),
            ("min_value_change", self.min_value_change),
            ("starter_weight_min", self.starter_weight_min),
            ("starter_weight_max", self.starter_weight_max),
            ("starter_value_ceiling", self.starter_value_ceiling),
            ("scale_weight_threshold", self.scale_weight_threshold),
            ("scale_value_threshold", self.scale_value_threshold),
            ("scale_up_min_growth", self.scale_up_min_growth),
            ("scale_up_min_impact", self.scale_up_min_impact),
            ("concentration_shift_min", self.concentration_shift_min),
            ("concentration_shift_strong", self.concentration_shift_strong),
            ("weight_sum_tolerance", self.weight_sum_tolerance),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::config_invalid(
                    "engine",
                    key,
                    "must be a non-negative number",
                ));
            }
        }

        if self.starter_weight_min > self.starter_weight_max {
            return Err(EngineError::config_invalid(
                "engine",
                "starter_weight_min",
                "must not exceed starter_weight_max",
            ));
        }
        if self.accumulator_moderate_streak == 0 {
            return Err(EngineError::config_invalid(
                "engine",
                "accumulator_moderate_streak",
                "must be at least 1",
            ));
        }
        if self.accumulator_moderate_streak > self.accumulator_strong_streak {
            return Err(EngineError::config_invalid(
                "engine",
                "accumulator_moderate_streak",
                "must not exceed accumulator_strong_streak",
            ));
        }
        if self.build_trim_min_streak == 0 {
            return Err(EngineError::config_invalid(
                "engine",
                "build_trim_min_streak",
                "must be at least 1",
            ));
        }
        if self.probe_min_span < 2 {
            return Err(EngineError::config_invalid(
                "engine",
                "probe_min_span",
                "a position lives at least 2 quarters from open to close",
            ));
        }
        if self.probe_min_span > self.probe_max_span {
            return Err(EngineError::config_invalid(
                "engine",
                "probe_min_span",
                "must not exceed probe_max_span",
            ));
        }
        if self.concentration_shift_min > self.concentration_shift_strong {
            return Err(EngineError::config_invalid(
                "engine",
                "concentration_shift_min",
                "must not exceed concentration_shift_strong",
            ));
        }
        if self.theme_min_starters == 0 {
            return Err(EngineError::config_invalid(
                "engine",
                "theme_min_starters",
                "must be at least 1",
            ));
        }
        if self.theme_min_starters > self.theme_strong_starters {
            return Err(EngineError::config_invalid(
                "engine",
                "theme_min_starters",
                "must not exceed theme_strong_starters",
            ));
        }
        Ok(())
    }

    pub fn is_excluded(&self, fund_id: &str) -> bool {
        self.universe_exclusions
            .iter()
            .any(|f| f.eq_ignore_ascii_case(fund_id))
    }
}
