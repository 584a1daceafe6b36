//! Report generation port trait.

use crate::domain::backtest::RunReport;
use crate::domain::error::SniperError;

/// Port for writing finished runs.
pub trait ReportPort {
    fn write(&self, report: &RunReport, output_path: &str) -> Result<(), SniperError>;

    /// Writes one report per run; stops at the first failure.
    fn write_all(&self, reports: &[(RunReport, String)]) -> Result<(), SniperError> {
        for (report, path) in reports {
            self.write(report, path)?;
        }
        Ok(())
    }
}
