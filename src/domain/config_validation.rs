//! Engine configuration loading and validation.
//!
//! Reads `[engine]` thresholds and the `[universe]` lists from a
//! [`ConfigPort`] and rejects bad values before any analysis runs.

use std::str::FromStr;

use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::universe::parse_fund_ids;
use crate::ports::config_port::ConfigPort;

const ENGINE: &str = "engine";
const UNIVERSE: &str = "universe";

/// Builds an [`EngineConfig`]. Missing keys take their defaults; present
/// keys that do not parse are errors.
pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let d = EngineConfig::default();
    let engine = EngineConfig {
        min_weight_change: read(config, "min_weight_change", d.min_weight_change)?,
        min_value_change: read(config, "min_value_change", d.min_value_change)?,
        starter_weight_min: read(config, "starter_weight_min", d.starter_weight_min)?,
        starter_weight_max: read(config, "starter_weight_max", d.starter_weight_max)?,
        starter_value_ceiling: read(config, "starter_value_ceiling", d.starter_value_ceiling)?,
        scale_weight_threshold: read(config, "scale_weight_threshold", d.scale_weight_threshold)?,
        scale_value_threshold: read(config, "scale_value_threshold", d.scale_value_threshold)?,
        scale_up_min_growth: read(config, "scale_up_min_growth", d.scale_up_min_growth)?,
        scale_up_min_impact: read(config, "scale_up_min_impact", d.scale_up_min_impact)?,
        accumulator_moderate_streak: read(
            config,
            "accumulator_moderate_streak",
            d.accumulator_moderate_streak,
        )?,
        accumulator_strong_streak: read(
            config,
            "accumulator_strong_streak",
            d.accumulator_strong_streak,
        )?,
        build_trim_min_streak: read(config, "build_trim_min_streak", d.build_trim_min_streak)?,
        probe_min_span: read(config, "probe_min_span", d.probe_min_span)?,
        probe_max_span: read(config, "probe_max_span", d.probe_max_span)?,
        concentration_shift_min: read(
            config,
            "concentration_shift_min",
            d.concentration_shift_min,
        )?,
        concentration_shift_strong: read(
            config,
            "concentration_shift_strong",
            d.concentration_shift_strong,
        )?,
        theme_min_starters: read(config, "theme_min_starters", d.theme_min_starters)?,
        theme_strong_starters: read(config, "theme_strong_starters", d.theme_strong_starters)?,
        weight_sum_tolerance: read(config, "weight_sum_tolerance", d.weight_sum_tolerance)?,
        universe_exclusions: config
            .get_list(UNIVERSE, "exclusions")
            .into_iter()
            .map(|f| f.to_uppercase())
            .collect(),
    };
    Ok(engine)
}

/// Loads and range-checks the engine configuration.
pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let engine = build_engine_config(config)?;
    engine.validate()?;
    Ok(engine)
}

/// Fund ids listed under `[universe] funds`, upper-cased. Empty when unset.
pub fn universe_funds(config: &dyn ConfigPort) -> Result<Vec<String>, EngineError> {
    match config.get_string(UNIVERSE, "funds") {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => parse_fund_ids(&raw)
            .map_err(|e| EngineError::config_invalid(UNIVERSE, "funds", e.to_string())),
    }
}

fn read<T: FromStr>(config: &dyn ConfigPort, key: &str, default: T) -> Result<T, EngineError> {
    match config.get_string(ENGINE, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            EngineError::config_invalid(ENGINE, key, format!("cannot parse '{}'", raw.trim()))
        }),
    }
}
