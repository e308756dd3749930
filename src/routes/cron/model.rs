use serde::{Deserialize, Serialize};

use crate::delivery::SweepReport;

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub scanned: usize,
    pub delivered: usize,
    pub not_due: usize,
    pub skipped: usize,
    pub deferred: usize,
    pub errors: Vec<String>,
}

impl From<&SweepReport> for SweepResponse {
    fn from(report: &SweepReport) -> Self {
        Self {
            scanned: report.scanned,
            delivered: report.delivered,
            not_due: report.not_due,
            skipped: report.skipped,
            deferred: report.deferred,
            errors: report.error_messages(),
        }
    }
}
