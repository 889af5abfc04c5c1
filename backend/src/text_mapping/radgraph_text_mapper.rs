//! Maps RadGraph token indices back onto character ranges of the report.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use common::{
    processed_annotations::ProcessedAnnotation,
    text_mapping::{TextMapping, TextRange},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadGraphEntity {
    pub tokens: String,
    pub label: String,
    pub start_ix: u32,
    pub end_ix: u32,
    #[serde(default)]
    pub relations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadGraphAnnotation {
    pub entities: BTreeMap<String, RadGraphEntity>,
}

/// Response of the RadGraph function for one report.
///
/// `radgraph_text` is the report re-tokenized with single spaces between
/// tokens; all token indices refer to positions in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadGraphOutput {
    pub radgraph_text: String,
    pub radgraph_annotations: BTreeMap<String, RadGraphAnnotation>,
    pub processed_annotations: Vec<ProcessedAnnotation>,
}

impl RadGraphOutput {
    pub fn entities(&self) -> anyhow::Result<&BTreeMap<String, RadGraphEntity>> {
        let annotation = self
            .radgraph_annotations
            .get("0")
            .context("RadGraph output has no annotations for the report")?;
        Ok(&annotation.entities)
    }

    /// The tokens RadGraph indices refer to.
    pub fn tokens(&self) -> Vec<&str> {
        self.radgraph_text.split(' ').collect()
    }
}

fn end_ix_for_start_ix(entities: &BTreeMap<String, RadGraphEntity>, start_ix: u32) -> Option<u32> {
    entities.values().find(|entity| entity.start_ix == start_ix).map(|entity| entity.end_ix)
}

/// Fills `located_at_end_ix` from the entity each located-at start index
/// belongs to. RadGraph only reports the start indices.
pub fn restore_located_at_end_ix(
    processed_annotations: &mut [ProcessedAnnotation],
    entities: &BTreeMap<String, RadGraphEntity>,
) -> anyhow::Result<()> {
    for annotation in processed_annotations.iter_mut() {
        let mut located_at_end_ix = Vec::with_capacity(annotation.located_at_start_ix.len());
        for start_group in &annotation.located_at_start_ix {
            let end_group = start_group
                .iter()
                .map(|&start_ix| {
                    end_ix_for_start_ix(entities, start_ix).with_context(|| {
                        tracing::error!("Matching end_ix not found for start_ix {}", start_ix);
                        format!(
                            "No entity starts at token {} for observation {:?}",
                            start_ix, annotation.observation
                        )
                    })
                })
                .collect::<anyhow::Result<Vec<u32>>>()?;
            located_at_end_ix.push(end_group);
        }
        annotation.located_at_end_ix = located_at_end_ix;
    }
    Ok(())
}

/// Finds every token in `user_provided_text`, scanning left to right.
///
/// Each token is matched at the first position at or after the end of the
/// previous match. A token that does not occur consumes the rest of the text
/// and gets no range, and neither do the tokens after it.
pub fn map_tokens_to_text_ranges(
    tokens: &[&str],
    user_provided_text: &str,
) -> BTreeMap<u32, TextRange> {
    let text = user_provided_text.chars().collect::<Vec<char>>();
    let mut ranges = BTreeMap::new();

    let mut text_pointer = 0;
    for (token_index, token) in tokens.iter().enumerate() {
        let token = token.chars().collect::<Vec<char>>();
        while text_pointer < text.len() {
            let matched = token
                .iter()
                .zip(&text[text_pointer..])
                .take_while(|(expected, actual)| expected == actual)
                .count();
            if matched >= token.len() {
                let range = TextRange::new(text_pointer, text_pointer + matched);
                ranges.insert(token_index as u32, range);
                text_pointer += matched;
                break;
            }
            text_pointer += 1;
        }
    }
    ranges
}

/// Inclusive token ranges of every observation and located-at mention,
/// deduplicated.
fn relevant_token_ranges(processed_annotations: &[ProcessedAnnotation]) -> BTreeSet<(u32, u32)> {
    let observations = processed_annotations.iter().flat_map(|annotation| {
        annotation
            .observation_start_ix
            .iter()
            .copied()
            .zip(annotation.observation_end_ix.iter().copied())
    });
    let relations = processed_annotations.iter().flat_map(|annotation| {
        annotation
            .located_at_start_ix
            .iter()
            .flatten()
            .copied()
            .zip(annotation.located_at_end_ix.iter().flatten().copied())
    });
    observations.chain(relations).collect()
}

/// Builds the text mapping of a report: the character range of every token
/// that some observation or location refers to.
///
/// `processed_annotations` must already have their located-at end indices.
pub fn entity_text_mapping(
    user_provided_text: &str,
    tokens: &[&str],
    processed_annotations: &[ProcessedAnnotation],
) -> anyhow::Result<TextMapping> {
    let token_ranges = map_tokens_to_text_ranges(tokens, user_provided_text);

    let mut text_mapping = TextMapping::new();
    for (start_ix, end_ix) in relevant_token_ranges(processed_annotations) {
        for token_index in start_ix..=end_ix {
            let range = token_ranges.get(&token_index).with_context(|| {
                format!("Token {} was not found in the user-provided text", token_index)
            })?;
            text_mapping.insert(token_index.to_string(), *range);
        }
    }
    Ok(text_mapping)
}

/// Restores the located-at end indices and maps the referenced tokens onto
/// the report text.
pub fn get_entity_mapping_in_user_entered_text(
    user_provided_text: &str,
    radgraph_output: &RadGraphOutput,
) -> anyhow::Result<(Vec<ProcessedAnnotation>, TextMapping)> {
    let mut processed_annotations = radgraph_output.processed_annotations.clone();
    restore_located_at_end_ix(&mut processed_annotations, radgraph_output.entities()?)?;
    let text_mapping =
        entity_text_mapping(user_provided_text, &radgraph_output.tokens(), &processed_annotations)?;
    Ok((processed_annotations, text_mapping))
}
