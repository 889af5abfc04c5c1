//! Pipeline settings read from the environment.

use std::time::Duration;

pub const DEFAULT_MAX_REPORTS_UPLOAD: usize = 5;
pub const DEFAULT_COMPUTE_ANNOTATIONS_TIMEOUT_SEC: u64 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_reports_upload: usize,
    pub compute_annotations_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_reports_upload: DEFAULT_MAX_REPORTS_UPLOAD,
            compute_annotations_timeout: Duration::from_secs(
                DEFAULT_COMPUTE_ANNOTATIONS_TIMEOUT_SEC,
            ),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", name, value);
            default
        }),
        Err(_) => default,
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            max_reports_upload: env_or("RADGPT_MAX_REPORTS_UPLOAD", DEFAULT_MAX_REPORTS_UPLOAD),
            compute_annotations_timeout: Duration::from_secs(env_or(
                "RADGPT_COMPUTE_ANNOTATIONS_TIMEOUT_SEC",
                DEFAULT_COMPUTE_ANNOTATIONS_TIMEOUT_SEC,
            )),
        }
    }
}
