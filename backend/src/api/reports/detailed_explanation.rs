//! Detailed explanations of single observations.

use anyhow::Context;
use common::{
    document_paths,
    explanation::{DetailedExplanation, DetailedExplanationRequest, observation_concept},
    report_document::ReportMetaData,
};

/// The language model that writes an explanation of a concept in the
/// context of the report it appears in.
pub trait ExplanationGenerator: Send + Sync + 'static {
    fn generate_explanation(
        &self,
        user_provided_text: &str,
        concept: &str,
    ) -> anyhow::Result<DetailedExplanation>;
}

/// Everything needed to generate, or look up, the explanation of one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedExplanation {
    pub concept: String,
    pub user_provided_text: String,
    pub cache_path: String,
}

pub fn prepare_detailed_explanation(
    user_id: &str,
    meta_data: &ReportMetaData,
    request: &DetailedExplanationRequest,
) -> anyhow::Result<PreparedExplanation> {
    let has_annotations =
        meta_data.processed_annotations.as_deref().is_some_and(|json| !json.is_empty());
    let is_annotated = meta_data.text_mapping.is_some() && has_annotations;
    if !is_annotated || meta_data.user_provided_text.is_empty() {
        tracing::warn!(
            "Explanation requested for {} before annotation finished",
            request.file_name
        );
        anyhow::bail!("Precondition missing for detailed explanation request.");
    }

    let processed_annotations =
        meta_data.processed_annotations().context("Invalid processed annotations")?;
    let Some(annotation) = processed_annotations.get(request.observation_id) else {
        tracing::warn!(
            "Observation {} requested for {} which has {} observations",
            request.observation_id,
            request.file_name,
            processed_annotations.len()
        );
        anyhow::bail!("Invalid observation id.");
    };

    Ok(PreparedExplanation {
        concept: observation_concept(annotation),
        user_provided_text: meta_data.user_provided_text.clone(),
        cache_path: document_paths::cached_answer(
            user_id,
            &request.file_name,
            request.observation_id,
        ),
    })
}

/// Returns the explanation for `request` and whether it has to be stored at
/// the cache path.
///
/// `cached` is the document already stored at the cache path; when present it
/// is returned as is, without looking at the report.
pub fn request_detailed_explanation<G: ExplanationGenerator>(
    generator: &G,
    user_id: &str,
    meta_data: &ReportMetaData,
    request: &DetailedExplanationRequest,
    cached: Option<DetailedExplanation>,
) -> anyhow::Result<(DetailedExplanation, bool)> {
    if let Some(explanation) = cached {
        tracing::info!(
            "Using cached explanation of observation {} in {}",
            request.observation_id,
            request.file_name
        );
        return Ok((explanation, false));
    }

    let prepared = prepare_detailed_explanation(user_id, meta_data, request)?;
    let explanation = generator
        .generate_explanation(&prepared.user_provided_text, &prepared.concept)
        .with_context(|| format!("Failed to explain {:?}", prepared.concept))?;
    tracing::info!("Generated explanation for {}", prepared.cache_path);
    Ok((explanation, true))
}
