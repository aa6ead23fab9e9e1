//! CSV snapshot adapter.
//!
//! One file per fund, `<fund_id>.csv`, with columns
//! `quarter,identifier,issuer,shares,value`. The quarter column takes either
//! `YYYYQn` or a period-of-report date (`YYYY-MM-DD`). A blank identifier
//! marks a holding that could not be resolved.

use crate::domain::error::EngineError;
use crate::domain::quarter::Quarter;
use crate::domain::snapshot::{Holding, Snapshot};
use crate::ports::snapshot_port::SnapshotPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct HoldingRow {
    quarter: String,
    identifier: String,
    issuer: String,
    shares: u64,
    value: f64,
}

pub struct CsvSnapshotAdapter {
    base_path: PathBuf,
}

impl CsvSnapshotAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, fund_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", fund_id))
    }
}

fn parse_quarter(raw: &str) -> Result<Quarter, EngineError> {
    let raw = raw.trim();
    if raw.contains('-') {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            EngineError::InvalidQuarter {
                input: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Quarter::from_period_end(date))
    } else {
        raw.parse()
    }
}

impl SnapshotPort for CsvSnapshotAdapter {
    fn load_snapshots(&self, fund_id: &str) -> Result<Vec<Snapshot>, EngineError> {
        let path = self.csv_path(fund_id);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::SnapshotSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut by_quarter: BTreeMap<Quarter, Vec<Holding>> = BTreeMap::new();

        for (line, result) in rdr.deserialize::<HoldingRow>().enumerate() {
            let row = result.map_err(|e| EngineError::SnapshotSource {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            let quarter = parse_quarter(&row.quarter)?;
            by_quarter.entry(quarter).or_default().push(Holding::new(
                &row.identifier,
                &row.issuer,
                row.shares,
                row.value,
            ));
        }

        debug!(fund = fund_id, quarters = by_quarter.len(), "loaded snapshots");
        Ok(by_quarter
            .into_iter()
            .map(|(quarter, holdings)| Snapshot::from_holdings(fund_id, quarter, holdings))
            .collect())
    }

    fn list_funds(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EngineError::SnapshotSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut funds = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::SnapshotSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "csv") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                funds.push(stem.to_string_lossy().into_owned());
            }
        }

        funds.sort();
        Ok(funds)
    }
}
