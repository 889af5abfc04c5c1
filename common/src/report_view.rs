//! Turning a report document into what the report page shows.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    explanation::DetailedExplanationRequest,
    processed_annotations::{AnnotationError, GroupMap, ObservationGroup, get_group_map_for_tokens},
    report_document::{AnnotationProcessingError, FileDetails, ReportDocumentError},
    text_mapping::{TextBlock, TextMappingError, get_text_blocks},
};

#[derive(Debug, Error)]
pub enum ReportViewError {
    #[error(transparent)]
    Document(#[from] ReportDocumentError),
    #[error(transparent)]
    TextMapping(#[from] TextMappingError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportView {
    /// The pipeline gave up; show the raw text with the error.
    Failed(AnnotationProcessingError),
    /// No text mapping yet; show the raw text as a placeholder.
    Processing,
    Annotated {
        text_blocks: Vec<TextBlock>,
        group_map: GroupMap,
    },
}

impl ReportView {
    /// Segments and groups the report when its annotations are ready.
    ///
    /// A document that is still processing or that failed is not an error;
    /// a malformed one is.
    pub fn from_file(file: &FileDetails) -> Result<Self, ReportViewError> {
        let meta_data = &file.meta_data;
        if let Some(error_code) = meta_data.error_code {
            return Ok(ReportView::Failed(error_code));
        }
        let Some(text_mapping) = meta_data.text_mapping.as_ref() else {
            return Ok(ReportView::Processing);
        };

        let text_blocks = get_text_blocks(text_mapping, &meta_data.user_provided_text)?;
        let known_tokens =
            text_blocks.iter().filter_map(|block| block.token).collect::<BTreeSet<u32>>();
        let group_map =
            get_group_map_for_tokens(&meta_data.processed_annotations()?, &known_tokens)?;
        Ok(ReportView::Annotated { text_blocks, group_map })
    }

    pub fn text_blocks(&self) -> &[TextBlock] {
        match self {
            ReportView::Annotated { text_blocks, .. } => text_blocks.as_slice(),
            _ => &[],
        }
    }

    /// The observation group of a block, if the block is an annotated token.
    pub fn group_for(&self, block: &TextBlock) -> Option<&ObservationGroup> {
        let ReportView::Annotated { group_map, .. } = self else {
            return None;
        };
        group_map.get(&block.token?)
    }

    /// Whether `block` is highlighted while `active_token` is hovered or open.
    pub fn is_highlighted(&self, block: &TextBlock, active_token: Option<u32>) -> bool {
        match (self.group_for(block), active_token) {
            (Some(group), Some(token)) => group.contains(token),
            _ => false,
        }
    }
}

/// The observation detail that is open, and the token it was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailOpenState {
    pub observation_index: usize,
    pub token: Option<u32>,
}

impl DetailOpenState {
    pub fn for_block(view: &ReportView, block: &TextBlock) -> Option<Self> {
        let group = view.group_for(block)?;
        Some(Self { observation_index: group.observation_index, token: block.token })
    }

    pub fn explanation_request(&self, file_name: &str) -> DetailedExplanationRequest {
        DetailedExplanationRequest {
            file_name: file_name.to_string(),
            observation_id: self.observation_index,
        }
    }
}

/// The token whose group is highlighted: the hovered one, else the one whose
/// detail is open.
pub fn active_token(hovered: Option<u32>, open_state: Option<&DetailOpenState>) -> Option<u32> {
    hovered.or_else(|| open_state.and_then(|state| state.token))
}
