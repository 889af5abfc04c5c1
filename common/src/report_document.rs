//! The per-report metadata document written by the annotation pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{processed_annotations::ProcessedAnnotation, text_mapping::TextMapping};

#[derive(Debug, Error)]
pub enum ReportDocumentError {
    #[error("processed annotations are not valid JSON: {0}")]
    InvalidAnnotationsJson(#[from] serde_json::Error),
    #[error("user-provided text is required")]
    MissingReportText,
    #[error("annotation {0} has an empty observation")]
    EmptyObservation(usize),
    #[error("annotation {0} has no observation range")]
    MissingObservationRange(usize),
    #[error("annotation {0} has no tags")]
    MissingTags(usize),
    #[error("unknown annotation error code {0}")]
    UnknownErrorCode(u8),
}

/// Why the pipeline gave up on a report. Stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AnnotationProcessingError {
    ValidationFailed = 1,
    UploadLimitReached = 2,
    Timeout = 3,
}

impl AnnotationProcessingError {
    /// What the report page shows in place of the annotations.
    pub fn message(&self) -> &'static str {
        match self {
            AnnotationProcessingError::ValidationFailed => {
                "This report could not be identified as a radiology report."
            }
            AnnotationProcessingError::UploadLimitReached => {
                "You have reached your limit for radiology report uploads."
            }
            AnnotationProcessingError::Timeout => {
                "An unknown error occurred. Please try again later."
            }
        }
    }

    pub fn is_retriable(&self) -> bool {
        *self == AnnotationProcessingError::Timeout
    }
}

impl TryFrom<u8> for AnnotationProcessingError {
    type Error = ReportDocumentError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(AnnotationProcessingError::ValidationFailed),
            2 => Ok(AnnotationProcessingError::UploadLimitReached),
            3 => Ok(AnnotationProcessingError::Timeout),
            other => Err(ReportDocumentError::UnknownErrorCode(other)),
        }
    }
}

impl From<AnnotationProcessingError> for u8 {
    fn from(error: AnnotationProcessingError) -> Self {
        error as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserFeedback {
    pub like: bool,
    pub dislike: bool,
}

/// `report_meta_data` document.
///
/// `processed_annotations` is kept as the JSON string the pipeline stores;
/// use [`ReportMetaData::processed_annotations`] to decode it. A missing
/// `text_mapping` without an `error_code` means the report is still being
/// processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReportMetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_annotations: Option<String>,
    #[serde(default)]
    pub user_provided_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_mapping: Option<TextMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<UserFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<AnnotationProcessingError>,
}

impl ReportMetaData {
    pub fn new(user_provided_text: impl Into<String>) -> Self {
        Self { user_provided_text: user_provided_text.into(), ..Default::default() }
    }

    pub fn failed(
        user_provided_text: impl Into<String>,
        error_code: AnnotationProcessingError,
    ) -> Self {
        Self { error_code: Some(error_code), ..Self::new(user_provided_text) }
    }

    /// Decodes the stored annotations. Absent or empty means none yet.
    pub fn processed_annotations(&self) -> Result<Vec<ProcessedAnnotation>, ReportDocumentError> {
        match self.processed_annotations.as_deref() {
            None | Some("") => Ok(vec![]),
            Some(json) => Ok(serde_json::from_str(json)?),
        }
    }

    pub fn set_processed_annotations(
        &mut self,
        annotations: &[ProcessedAnnotation],
    ) -> Result<(), ReportDocumentError> {
        self.processed_annotations = Some(serde_json::to_string(annotations)?);
        Ok(())
    }

    pub fn is_processing(&self) -> bool {
        self.error_code.is_none() && self.text_mapping.is_none()
    }

    pub fn validate(&self) -> Result<(), ReportDocumentError> {
        if self.user_provided_text.is_empty() {
            return Err(ReportDocumentError::MissingReportText);
        }
        for (index, annotation) in self.processed_annotations()?.iter().enumerate() {
            if annotation.observation.is_empty() {
                return Err(ReportDocumentError::EmptyObservation(index));
            }
            if annotation.observation_start_ix.is_empty()
                || annotation.observation_end_ix.is_empty()
            {
                return Err(ReportDocumentError::MissingObservationRange(index));
            }
            if annotation.tags.is_empty() {
                return Err(ReportDocumentError::MissingTags(index));
            }
        }
        Ok(())
    }
}

/// A report document together with the file it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDetails {
    pub name: String,
    pub meta_data: ReportMetaData,
}
