//! Computing the annotations of an uploaded report.

use std::{sync::Arc, time::SystemTime};

use anyhow::Context;
use common::report_document::{AnnotationProcessingError, ReportMetaData};

use crate::{
    api::reports::upload_limit::UploadLimiter,
    config::PipelineConfig,
    text_mapping::radgraph_text_mapper::{RadGraphOutput, get_entity_mapping_in_user_entered_text},
};

/// The services a report is sent to: a check that the text is a radiology
/// report, and RadGraph itself.
pub trait ReportAnnotator: Send + Sync + 'static {
    fn validate_report(&self, user_provided_report: &str) -> anyhow::Result<bool>;
    fn annotate_report(&self, user_provided_report: &str) -> anyhow::Result<RadGraphOutput>;
}

fn annotate<A: ReportAnnotator>(
    annotator: &A,
    user_provided_report: &str,
) -> anyhow::Result<ReportMetaData> {
    if !annotator.validate_report(user_provided_report).context("Report validation failed")? {
        tracing::info!("Report was not recognized as a radiology report");
        return Ok(ReportMetaData::failed(
            user_provided_report,
            AnnotationProcessingError::ValidationFailed,
        ));
    }

    let radgraph_output =
        annotator.annotate_report(user_provided_report).context("RadGraph request failed")?;
    let (processed_annotations, text_mapping) =
        get_entity_mapping_in_user_entered_text(user_provided_report, &radgraph_output)?;

    let mut meta_data = ReportMetaData::new(user_provided_report);
    meta_data.set_processed_annotations(&processed_annotations)?;
    meta_data.text_mapping = Some(text_mapping);
    tracing::info!(
        "Annotated report with {} observations and {} mapped tokens",
        processed_annotations.len(),
        meta_data.text_mapping.as_ref().map(|mapping| mapping.len()).unwrap_or(0)
    );
    Ok(meta_data)
}

fn now_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// Produces the `report_meta_data` document for a report.
///
/// Every failure ends up as an `error_code` on the document: a user over the
/// upload limit gets `UploadLimitReached`, text that is not a radiology report
/// gets `ValidationFailed`, and anything that fails or runs past the configured
/// timeout gets `Timeout`.
///
/// `upload_limiter` is the user's stored `users_limit` record; a user without
/// one gets a record with the configured limit, which is left in its place.
pub async fn compute_annotations<A: ReportAnnotator>(
    annotator: Arc<A>,
    upload_limiter: &mut Option<UploadLimiter>,
    file_name: &str,
    user_provided_report: String,
    config: &PipelineConfig,
) -> ReportMetaData {
    let record = UploadLimiter::for_user(upload_limiter.take(), config);
    let upload_limiter = upload_limiter.insert(record);
    if !upload_limiter.admit(file_name, now_timestamp()) {
        return ReportMetaData::failed(
            user_provided_report,
            AnnotationProcessingError::UploadLimitReached,
        );
    }

    let report = user_provided_report.clone();
    let task = tokio::task::spawn_blocking(move || annotate(annotator.as_ref(), &report));
    match tokio::time::timeout(config.compute_annotations_timeout, task).await {
        Ok(Ok(Ok(meta_data))) => meta_data,
        Ok(Ok(Err(e))) => {
            tracing::error!("compute_annotations: {} failed: {:#?}", file_name, e);
            ReportMetaData::failed(user_provided_report, AnnotationProcessingError::Timeout)
        }
        Ok(Err(e)) => {
            tracing::error!("compute_annotations: {} task panicked: {}", file_name, e);
            ReportMetaData::failed(user_provided_report, AnnotationProcessingError::Timeout)
        }
        Err(_) => {
            tracing::warn!(
                "compute_annotations: {} timed out after {:?}",
                file_name,
                config.compute_annotations_timeout
            );
            ReportMetaData::failed(user_provided_report, AnnotationProcessingError::Timeout)
        }
    }
}

/// Annotation can only be re-run for reports that previously timed out.
pub fn can_retrigger_annotation(meta_data: &ReportMetaData) -> anyhow::Result<()> {
    match meta_data.error_code {
        Some(error_code) if error_code.is_retriable() => Ok(()),
        _ => anyhow::bail!("The report must have failed due to timeout to be annotated again"),
    }
}

pub async fn retrigger_annotations<A: ReportAnnotator>(
    annotator: Arc<A>,
    upload_limiter: &mut Option<UploadLimiter>,
    file_name: &str,
    meta_data: &ReportMetaData,
    config: &PipelineConfig,
) -> anyhow::Result<ReportMetaData> {
    can_retrigger_annotation(meta_data)?;
    tracing::info!("Re-running annotation for {}", file_name);
    let user_provided_report = meta_data.user_provided_text.clone();
    let meta_data =
        compute_annotations(annotator, upload_limiter, file_name, user_provided_report, config)
            .await;
    Ok(meta_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_can_be_retriggered() {
        let failed = |error_code| ReportMetaData::failed("x", error_code);
        assert!(can_retrigger_annotation(&failed(AnnotationProcessingError::Timeout)).is_ok());
        assert!(can_retrigger_annotation(&failed(AnnotationProcessingError::ValidationFailed)).is_err());
        assert!(can_retrigger_annotation(&ReportMetaData::new("x")).is_err());
    }
}
