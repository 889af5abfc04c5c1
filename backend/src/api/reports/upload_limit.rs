//! Per-user cap on the number of reports that get annotated.

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedReport {
    pub file_name: String,
    pub access_date: f64,
}

/// The `users_limit` record of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadLimiter {
    pub limit: usize,
    #[serde(default)]
    pub reports: Vec<UploadedReport>,
}

impl UploadLimiter {
    pub fn new(limit: usize) -> Self {
        Self { limit, reports: vec![] }
    }

    /// The stored record of a user, or a fresh one with the configured limit
    /// for a user that never uploaded.
    pub fn for_user(record: Option<UploadLimiter>, config: &PipelineConfig) -> Self {
        record.unwrap_or_else(|| Self::new(config.max_reports_upload))
    }

    /// Admits a report for annotation and records it.
    ///
    /// A report that was admitted before is always admitted again, so
    /// re-running a report does not count against the limit.
    pub fn admit(&mut self, file_name: &str, access_date: f64) -> bool {
        if self.reports.iter().any(|report| report.file_name == file_name) {
            return true;
        }
        if self.reports.len() >= self.limit {
            tracing::info!("Upload limit of {} reached, rejecting {}", self.limit, file_name);
            return false;
        }
        self.reports.push(UploadedReport { file_name: file_name.to_string(), access_date });
        true
    }
}
