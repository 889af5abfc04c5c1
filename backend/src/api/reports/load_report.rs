//! Reading a report document for display.

use anyhow::Context;
use common::{
    report_document::{FileDetails, ReportMetaData},
    report_view::ReportView,
};

/// Parses and validates a `report_meta_data` document.
pub fn load_report(file_name: &str, document: serde_json::Value) -> anyhow::Result<FileDetails> {
    let meta_data = serde_json::from_value::<ReportMetaData>(document)
        .with_context(|| format!("Invalid report document for {}", file_name))?;
    meta_data.validate().with_context(|| format!("Invalid report document for {}", file_name))?;
    Ok(FileDetails { name: file_name.to_string(), meta_data })
}

/// The notice shown instead of annotations, if the report has one.
pub fn report_notice(view: &ReportView) -> Option<&'static str> {
    match view {
        ReportView::Failed(error_code) => Some(error_code.message()),
        ReportView::Processing | ReportView::Annotated { .. } => None,
    }
}

pub fn render_report(file: &FileDetails) -> anyhow::Result<ReportView> {
    let view = ReportView::from_file(file)
        .with_context(|| format!("Failed to render report {}", file.name))?;
    match &view {
        ReportView::Failed(error_code) => tracing::info!(
            "Report {} failed ({:?}): {}",
            file.name,
            error_code,
            error_code.message()
        ),
        ReportView::Processing => tracing::info!("Report {} is still processing", file.name),
        ReportView::Annotated { text_blocks, group_map } => tracing::info!(
            "Report {}: {} text blocks, {} annotated tokens",
            file.name,
            text_blocks.len(),
            group_map.len()
        ),
    }
    Ok(view)
}
