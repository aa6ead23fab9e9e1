//! Engine error types.
//!
//! Only contract violations and adapter failures are errors. Data-quality
//! problems inside a snapshot become [`DataWarning`](crate::domain::analysis::DataWarning)s
//! on the analysis result instead.

use crate::domain::universe::UniverseError;

/// Top-level error type for fundlens.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no snapshots supplied for fund {fund_id}")]
    EmptySeries { fund_id: String },

    #[error("duplicate quarter {quarter} in series for fund {fund_id}")]
    DuplicateQuarter { fund_id: String, quarter: String },

    #[error("quarter {quarter} follows {previous} in series for fund {fund_id}")]
    OutOfOrderQuarter {
        fund_id: String,
        previous: String,
        quarter: String,
    },

    #[error("snapshot for fund {found} in series for fund {expected}")]
    FundMismatch { expected: String, found: String },

    #[error("identifier {identifier} appears twice in {fund_id} {quarter}")]
    DuplicateHolding {
        fund_id: String,
        quarter: String,
        identifier: String,
    },

    #[error("invalid quarter '{input}': {reason}")]
    InvalidQuarter { input: String, reason: String },

    #[error("invalid fund universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("snapshot source error: {reason}")]
    SnapshotSource { reason: String },

    #[error("report output error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error's category.
    pub fn exit_status(&self) -> u8 {
        match self {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::SnapshotSource { .. } => 3,
            EngineError::EmptySeries { .. }
            | EngineError::DuplicateQuarter { .. }
            | EngineError::OutOfOrderQuarter { .. }
            | EngineError::FundMismatch { .. }
            | EngineError::DuplicateHolding { .. }
            | EngineError::InvalidQuarter { .. }
            | EngineError::Universe(_) => 4,
            EngineError::Report { .. } => 5,
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
