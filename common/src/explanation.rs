//! Detailed explanation requests and answers.

use serde::{Deserialize, Serialize};

use crate::processed_annotations::ProcessedAnnotation;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailedExplanationRequest {
    pub file_name: String,
    pub observation_id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedExplanation {
    pub main_explanation: String,
    pub concept_question_1: Option<String>,
    pub concept_answer_1: Option<String>,
    pub concept_question_2: Option<String>,
    pub concept_answer_2: Option<String>,
}

impl DetailedExplanation {
    /// Question/answer pairs that are present, in order.
    pub fn questions(&self) -> Vec<(&str, &str)> {
        [
            (&self.concept_question_1, &self.concept_answer_1),
            (&self.concept_question_2, &self.concept_answer_2),
        ]
        .into_iter()
        .filter_map(|(question, answer)| Some((question.as_deref()?, answer.as_deref()?)))
        .collect()
    }
}

/// The phrase an explanation is generated for: the observation, then its
/// locations, then what it is suggestive of.
pub fn observation_concept(annotation: &ProcessedAnnotation) -> String {
    let mut concept = annotation.observation.clone();
    if !annotation.located_at.is_empty() {
        concept.push(' ');
        concept.push_str(&annotation.located_at.join(" "));
    }
    let suggestive_of = annotation.suggestive_of.as_ref().filter(|terms| !terms.is_empty());
    if let Some(suggestive_of) = suggestive_of {
        concept.push(' ');
        concept.push_str(&suggestive_of.join(" "));
    }
    concept
}
