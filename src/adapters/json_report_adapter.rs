//! JSON result writer implementing ReportPort.
//!
//! A structured export of the analysis and universe results. An output path
//! of `-` writes to stdout.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::analysis::AnalysisResult;
use crate::domain::error::EngineError;
use crate::domain::universe::UniverseResult;
use crate::ports::report_port::ReportPort;

pub const STDOUT: &str = "-";

pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String, EngineError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.map_err(|e| EngineError::Report {
            reason: format!("failed to serialize result: {}", e),
        })
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: &str) -> Result<(), EngineError> {
        let body = self.render(value)?;
        if output_path == STDOUT {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", body)?;
            return Ok(());
        }

        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(path, body + "\n").map_err(|e| EngineError::Report {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;
        info!(path = output_path, "wrote report");
        Ok(())
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_analysis(&self, result: &AnalysisResult, output_path: &str) -> Result<(), EngineError> {
        self.write_json(result, output_path)
    }

    fn write_universe(&self, result: &UniverseResult, output_path: &str) -> Result<(), EngineError> {
        self.write_json(result, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::analyze_fund;
    use crate::domain::config::EngineConfig;
    use crate::domain::quarter::Quarter;
    use crate::domain::snapshot::{Holding, Snapshot};
    use crate::domain::universe::compare_universe;
    use crate::ports::cluster_port::ClusterLookup;
    use tempfile::TempDir;

    struct NoLabels;

    impl ClusterLookup for NoLabels {
        fn label_for(&self, _identifier: &str, _issuer: &str) -> Option<String> {
            None
        }
    }

    fn sample_result(fund: &str) -> AnalysisResult {
        let q1: Quarter = "2024Q1".parse().unwrap();
        let q2: Quarter = "2024Q2".parse().unwrap();
        let snapshots = vec![
            Snapshot::from_holdings(fund, q1, vec![Holding::new("NVDA", "NVIDIA CORP", 10, 1e6)]),
            Snapshot::from_holdings(
                fund,
                q2,
                vec![
                    Holding::new("NVDA", "NVIDIA CORP", 20, 2e6),
                    Holding::new("CRM", "SALESFORCE INC", 5, 5e5),
                ],
            ),
        ];
        analyze_fund(&snapshots, &EngineConfig::default(), &NoLabels).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_analysis_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PERSHING.json");
        let adapter = JsonReportAdapter::default();

        adapter
            .write_analysis(&sample_result("PERSHING"), &path.to_string_lossy())
            .unwrap();

        let json = read_json(&path);
        assert_eq!(json["fund_id"], "PERSHING");
        assert_eq!(json["quarter_range"][0], "2024Q1");
        assert_eq!(json["quarter_range"][1], "2024Q2");
        assert_eq!(json["deltas"].as_array().unwrap().len(), 2);
        assert_eq!(json["deltas"][0]["identifier"], "CRM");
        assert_eq!(json["deltas"][0]["kind"], "new");
    }

    #[test]
    fn write_all_names_files_by_fund() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested");
        let results = vec![sample_result("BAUPOST"), sample_result("TIGER")];
        let universe = compare_universe(
            &results,
            "2024Q2".parse().unwrap(),
            &EngineConfig::default(),
        )
        .unwrap();

        JsonReportAdapter::new(false)
            .write_all(&results, &universe, &out.to_string_lossy(), "json")
            .unwrap();

        assert!(out.join("BAUPOST.json").exists());
        assert!(out.join("TIGER.json").exists());
        let json = read_json(&out.join("universe_2024Q2.json"));
        assert_eq!(json["quarter"], "2024Q2");
        assert_eq!(json["shared_moves"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn unwritable_path_is_a_report_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("out.json");

        let err = JsonReportAdapter::default()
            .write_analysis(&sample_result("FUND"), &path.to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, EngineError::Report { .. }));
    }
}
