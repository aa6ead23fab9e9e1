//! Result sink port. Consumers turn these structures into reports.

use crate::domain::analysis::AnalysisResult;
use crate::domain::error::EngineError;
use crate::domain::universe::UniverseResult;

pub trait ReportPort {
    fn write_analysis(&self, result: &AnalysisResult, output_path: &str) -> Result<(), EngineError>;

    fn write_universe(&self, result: &UniverseResult, output_path: &str) -> Result<(), EngineError>;

    /// Default implementation: one output per fund, named `<fund>.<ext>` under
    /// `output_dir`, followed by the universe comparison.
    fn write_all(
        &self,
        results: &[AnalysisResult],
        universe: &UniverseResult,
        output_dir: &str,
        extension: &str,
    ) -> Result<(), EngineError> {
        let dir = std::path::Path::new(output_dir);
        for result in results {
            let path = dir.join(format!("{}.{}", result.fund_id, extension));
            self.write_analysis(result, &path.to_string_lossy())?;
        }
        let path = dir.join(format!("universe_{}.{}", universe.quarter, extension));
        self.write_universe(universe, &path.to_string_lossy())
    }
}
