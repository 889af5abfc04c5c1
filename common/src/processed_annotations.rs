//! Clinical observation records and the token to observation-group lookup.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observation produced by the annotation pipeline.
///
/// All `*_ix` values are inclusive token id ranges, not character offsets.
/// `located_at_start_ix[i][j]..=located_at_end_ix[i][j]` is the j-th anatomic
/// location linked to the i-th located-at group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAnnotation {
    pub observation: String,
    pub observation_start_ix: Vec<u32>,
    pub observation_end_ix: Vec<u32>,
    pub located_at: Vec<String>,
    pub located_at_start_ix: Vec<Vec<u32>>,
    #[serde(default)]
    pub located_at_end_ix: Vec<Vec<u32>>,
    pub tags: Vec<String>,
    pub suggestive_of: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("observation {observation_index} has {starts} start indices but {ends} end indices")]
    MismatchedObservationRanges {
        observation_index: usize,
        starts: usize,
        ends: usize,
    },
    #[error(
        "observation {observation_index} has located-at group {group_index} \
         without matching end indices"
    )]
    MismatchedLocatedAtRanges { observation_index: usize, group_index: usize },
    #[error("observation {observation_index} has an inverted token range {start}..={end}")]
    InvertedRange { observation_index: usize, start: u32, end: u32 },
    #[error("observation {observation_index} refers to unmapped token {token}")]
    UnknownToken { observation_index: usize, token: u32 },
}

/// Token ids covered by one observation, in range order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationTokens {
    pub observation_group: Vec<u32>,
    pub located_at_elements: BTreeSet<u32>,
}

fn expand_range(
    observation_index: usize,
    start: u32,
    end: u32,
) -> Result<std::ops::RangeInclusive<u32>, AnnotationError> {
    if start > end {
        return Err(AnnotationError::InvertedRange { observation_index, start, end });
    }
    Ok(start..=end)
}

impl ProcessedAnnotation {
    /// Every inclusive range, observation mentions first. Unpaired starts are skipped.
    pub fn token_ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let observations = self
            .observation_start_ix
            .iter()
            .copied()
            .zip(self.observation_end_ix.iter().copied());
        let located_at = self
            .located_at_start_ix
            .iter()
            .zip(&self.located_at_end_ix)
            .flat_map(|(starts, ends)| starts.iter().copied().zip(ends.iter().copied()));
        observations.chain(located_at)
    }

    /// Checks that every token the ranges cover is one of `known_tokens`.
    ///
    /// Stops at the first unknown token, so a range wider than the mapping
    /// is never walked past it.
    pub fn check_known_tokens(
        &self,
        observation_index: usize,
        known_tokens: &BTreeSet<u32>,
    ) -> Result<(), AnnotationError> {
        for (start, end) in self.token_ranges() {
            for token in expand_range(observation_index, start, end)? {
                if !known_tokens.contains(&token) {
                    return Err(AnnotationError::UnknownToken { observation_index, token });
                }
            }
        }
        Ok(())
    }

    /// Expands the observation ranges followed by every located-at range.
    pub fn tokens(&self, observation_index: usize) -> Result<ObservationTokens, AnnotationError> {
        if self.observation_start_ix.len() != self.observation_end_ix.len() {
            return Err(AnnotationError::MismatchedObservationRanges {
                observation_index,
                starts: self.observation_start_ix.len(),
                ends: self.observation_end_ix.len(),
            });
        }

        let mut tokens = ObservationTokens::default();
        for (&start, &end) in self.observation_start_ix.iter().zip(&self.observation_end_ix) {
            tokens.observation_group.extend(expand_range(observation_index, start, end)?);
        }

        for (group_index, start_group) in self.located_at_start_ix.iter().enumerate() {
            let end_group = self
                .located_at_end_ix
                .get(group_index)
                .filter(|end_group| end_group.len() == start_group.len())
                .ok_or(AnnotationError::MismatchedLocatedAtRanges {
                    observation_index,
                    group_index,
                })?;
            for (&start, &end) in start_group.iter().zip(end_group) {
                for token in expand_range(observation_index, start, end)? {
                    tokens.located_at_elements.insert(token);
                    tokens.observation_group.push(token);
                }
            }
        }
        Ok(tokens)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Highlight {
    Observation,
    AnatomicLocation,
}

/// What a single token belongs to.
///
/// `observation_index` and `is_located_at` come from the first observation
/// that covers the token, `observation_group` collects the tokens of every
/// observation that covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationGroup {
    pub observation_index: usize,
    pub observation_group: Vec<u32>,
    pub is_located_at: bool,
}

impl ObservationGroup {
    pub fn contains(&self, token: u32) -> bool {
        self.observation_group.contains(&token)
    }

    pub fn highlight(&self) -> Highlight {
        if self.is_located_at { Highlight::AnatomicLocation } else { Highlight::Observation }
    }
}

pub type GroupMap = BTreeMap<u32, ObservationGroup>;

/// Builds the token id to observation group lookup.
///
/// Tokens that no observation covers are absent from the map.
pub fn get_group_map(
    processed_annotations: &[ProcessedAnnotation],
) -> Result<GroupMap, AnnotationError> {
    processed_annotations
        .iter()
        .enumerate()
        .try_fold(GroupMap::new(), |mut group_map, (observation_index, annotation)| {
            let tokens = annotation.tokens(observation_index)?;
            let distinct = tokens.observation_group.iter().copied().collect::<BTreeSet<u32>>();
            for token in distinct {
                group_map
                    .entry(token)
                    .and_modify(|group| {
                        group.observation_group.extend_from_slice(&tokens.observation_group)
                    })
                    .or_insert_with(|| ObservationGroup {
                        observation_index,
                        observation_group: tokens.observation_group.clone(),
                        is_located_at: tokens.located_at_elements.contains(&token),
                    });
            }
            Ok(group_map)
        })
}

/// Like [`get_group_map`], but first rejects any range that reaches a token
/// outside `known_tokens`, the token ids of the report's text mapping.
pub fn get_group_map_for_tokens(
    processed_annotations: &[ProcessedAnnotation],
    known_tokens: &BTreeSet<u32>,
) -> Result<GroupMap, AnnotationError> {
    for (observation_index, annotation) in processed_annotations.iter().enumerate() {
        annotation.check_known_tokens(observation_index, known_tokens)?;
    }
    get_group_map(processed_annotations)
}
