//! Report upload, annotation and display functions.

pub mod upload;
pub mod upload_limit;
pub mod compute_annotations;
pub mod load_report;
pub mod detailed_explanation;

pub use compute_annotations::{ReportAnnotator, compute_annotations, retrigger_annotations};
pub use detailed_explanation::{
    ExplanationGenerator, prepare_detailed_explanation, request_detailed_explanation,
};
pub use load_report::{load_report, render_report, report_notice};
pub use upload::{find_existing_report, report_file_name};
pub use upload_limit::UploadLimiter;
