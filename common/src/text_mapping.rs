//! Splitting report text into display blocks along annotated token ranges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-open character range of one token inside the user-provided text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TextRange {
    pub user_provided_text_start: usize,
    pub user_provided_text_end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { user_provided_text_start: start, user_provided_text_end: end }
    }
}

/// Token id (stringified integer) to text range, as stored in the report document.
pub type TextMapping = BTreeMap<String, TextRange>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextMappingError {
    #[error("text mapping key {0:?} is not a token id")]
    MalformedTokenId(String),
    #[error("token {token} has an inverted range {start}..{end}")]
    InvalidRange { token: u32, start: usize, end: usize },
    #[error("token {token} ends at {end}, past the end of the text ({text_len} characters)")]
    RangeOutOfBounds { token: u32, end: usize, text_len: usize },
    #[error("token {token} starts at {start}, before the previous token ended at {previous_end}")]
    OverlappingRange { token: u32, start: usize, previous_end: usize },
}

/// A text mapping entry with its key parsed into a token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub token: u32,
    pub start: usize,
    pub end: usize,
}

/// Parses every key of the mapping and returns the entries ordered by numeric token id.
pub fn token_spans(text_mapping: &TextMapping) -> Result<Vec<TokenSpan>, TextMappingError> {
    let mut spans = text_mapping
        .iter()
        .map(|(key, range)| {
            let token = key
                .parse::<u32>()
                .map_err(|_| TextMappingError::MalformedTokenId(key.clone()))?;
            Ok(TokenSpan {
                token,
                start: range.user_provided_text_start,
                end: range.user_provided_text_end,
            })
        })
        .collect::<Result<Vec<_>, TextMappingError>>()?;
    // keys are stored as strings, so "10" sorts before "9" until parsed
    spans.sort_by_key(|span| span.token);
    Ok(spans)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TextBlockPosition {
    #[default]
    StandAlone,
    Left,
    Center,
    Right,
}

impl TextBlockPosition {
    pub fn css_class(&self) -> &'static str {
        match self {
            TextBlockPosition::StandAlone => "keyword-highlight",
            TextBlockPosition::Left => "keyword-highlight-left",
            TextBlockPosition::Center => "keyword-highlight-center",
            TextBlockPosition::Right => "keyword-highlight-right",
        }
    }
}

/// One contiguous slice of the report text.
///
/// `token` is `None` for the plain text between annotated tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub token: Option<u32>,
    pub text_string: String,
    pub start_position: usize,
    pub position: TextBlockPosition,
}

impl TextBlock {
    fn plain(text_string: &str, start_position: usize) -> Self {
        Self {
            token: None,
            text_string: text_string.to_string(),
            start_position,
            position: TextBlockPosition::StandAlone,
        }
    }

    fn token(span: &TokenSpan, text_string: &str, position: TextBlockPosition) -> Self {
        Self {
            token: Some(span.token),
            text_string: text_string.to_string(),
            start_position: span.start,
            position,
        }
    }
}

/// Text indexed by character rather than by byte.
struct CharIndexedText<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
}

impl<'a> CharIndexedText<'a> {
    fn new(text: &'a str) -> Self {
        let boundaries = text
            .char_indices()
            .map(|(byte_index, _)| byte_index)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, boundaries }
    }

    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.boundaries[start]..self.boundaries[end]]
    }
}

fn check_span(
    span: &TokenSpan,
    text_len: usize,
    last_index: usize,
) -> Result<(), TextMappingError> {
    let TokenSpan { token, start, end } = *span;
    if start > end {
        return Err(TextMappingError::InvalidRange { token, start, end });
    }
    if end > text_len {
        return Err(TextMappingError::RangeOutOfBounds { token, end, text_len });
    }
    if start < last_index {
        return Err(TextMappingError::OverlappingRange {
            token,
            start,
            previous_end: last_index,
        });
    }
    Ok(())
}

/// Partitions `user_provided_text` into blocks, one per mapped token plus the
/// plain text between them.
///
/// Concatenating the `text_string` of the returned blocks gives back the input
/// text. Tokens that touch each other with no gap are tagged `Left`, `Center`
/// and `Right` so a renderer can draw them as one continuous highlight. A token
/// that opens the text keeps its `StandAlone` tag.
pub fn get_text_blocks(
    text_mapping: &TextMapping,
    user_provided_text: &str,
) -> Result<Vec<TextBlock>, TextMappingError> {
    let spans = token_spans(text_mapping)?;
    let text = CharIndexedText::new(user_provided_text);
    let mut blocks: Vec<TextBlock> = Vec::with_capacity(spans.len() * 2 + 1);

    let mut last_index = 0;
    let mut is_previous_token_adjacent = false;
    for span in &spans {
        check_span(span, text.char_len(), last_index)?;

        if last_index == 0 && span.start == 0 {
            let text_string = text.slice(span.start, span.end);
            blocks.push(TextBlock::token(span, text_string, TextBlockPosition::StandAlone));
            is_previous_token_adjacent = true;
            last_index = span.end;
            continue;
        }

        if span.start > last_index {
            blocks.push(TextBlock::plain(text.slice(last_index, span.start), last_index));
            is_previous_token_adjacent = false;
        } else {
            if let Some(previous) = blocks.last_mut() {
                if previous.start_position != 0 {
                    previous.position = if is_previous_token_adjacent {
                        TextBlockPosition::Center
                    } else {
                        TextBlockPosition::Left
                    };
                }
            }
            is_previous_token_adjacent = true;
        }

        let position = if is_previous_token_adjacent {
            TextBlockPosition::Right
        } else {
            TextBlockPosition::StandAlone
        };
        blocks.push(TextBlock::token(span, text.slice(span.start, span.end), position));
        last_index = span.end;
    }

    blocks.push(TextBlock::plain(text.slice(last_index, text.char_len()), last_index));
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, usize, usize)]) -> TextMapping {
        entries
            .iter()
            .map(|(key, start, end)| (key.to_string(), TextRange::new(*start, *end)))
            .collect()
    }

    fn joined(blocks: &[TextBlock]) -> String {
        blocks.iter().map(|block| block.text_string.as_str()).collect()
    }

    fn positions(blocks: &[TextBlock]) -> Vec<(Option<u32>, TextBlockPosition)> {
        blocks.iter().map(|block| (block.token, block.position)).collect()
    }

    #[test]
    fn splits_report_around_tokens() {
        let text = "The liver shows a lesion.";
        let blocks = get_text_blocks(&mapping(&[("0", 4, 9), ("1", 18, 24)]), text).unwrap();

        let expected = vec![
            (None, "The ", 0),
            (Some(0), "liver", 4),
            (None, " shows a ", 9),
            (Some(1), "lesion", 18),
            (None, ".", 24),
        ];
        let actual = blocks
            .iter()
            .map(|block| (block.token, block.text_string.as_str(), block.start_position))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected);
        assert!(blocks.iter().all(|block| block.position == TextBlockPosition::StandAlone));
        assert_eq!(joined(&blocks), text);
    }

    #[test]
    fn empty_mapping_yields_whole_text() {
        let blocks = get_text_blocks(&TextMapping::new(), "No findings.").unwrap();
        assert_eq!(
            blocks,
            vec![TextBlock {
                token: None,
                text_string: "No findings.".to_string(),
                start_position: 0,
                position: TextBlockPosition::StandAlone,
            }]
        );
    }

    #[test]
    fn adjacent_tokens_form_left_right_pair() {
        let text = "a smallnodule";
        let blocks = get_text_blocks(&mapping(&[("3", 2, 7), ("4", 7, 13)]), text).unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (None, TextBlockPosition::StandAlone),
                (Some(3), TextBlockPosition::Left),
                (Some(4), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );
        assert_eq!(joined(&blocks), text);
    }

    #[test]
    fn three_adjacent_tokens_form_left_center_right() {
        let text = "x: abc";
        let blocks = get_text_blocks(&mapping(&[("0", 3, 4), ("1", 4, 5), ("2", 5, 6)]), text).unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (None, TextBlockPosition::StandAlone),
                (Some(0), TextBlockPosition::Left),
                (Some(1), TextBlockPosition::Center),
                (Some(2), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );
        assert_eq!(blocks.last().unwrap().text_string, "");
    }

    #[test]
    fn filler_between_runs_restarts_at_left() {
        let text = "x ab cd";
        let blocks =
            get_text_blocks(&mapping(&[("0", 2, 3), ("1", 3, 4), ("2", 5, 6), ("3", 6, 7)]), text)
                .unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (None, TextBlockPosition::StandAlone),
                (Some(0), TextBlockPosition::Left),
                (Some(1), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
                (Some(2), TextBlockPosition::Left),
                (Some(3), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );
        assert_eq!(blocks[3].text_string, " ");
        assert_eq!(joined(&blocks), text);
    }

    #[test]
    fn run_after_leading_token_keeps_its_shape() {
        let text = "a bcd";
        let blocks =
            get_text_blocks(&mapping(&[("0", 0, 1), ("1", 2, 3), ("2", 3, 4), ("3", 4, 5)]), text)
                .unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (Some(0), TextBlockPosition::StandAlone),
                (None, TextBlockPosition::StandAlone),
                (Some(1), TextBlockPosition::Left),
                (Some(2), TextBlockPosition::Center),
                (Some(3), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );
        assert_eq!(joined(&blocks), text);

        // a run starting at the very first character never gets a Left
        let blocks =
            get_text_blocks(&mapping(&[("0", 0, 1), ("1", 1, 2), ("2", 2, 3), ("3", 3, 4)]), "abcd")
                .unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (Some(0), TextBlockPosition::StandAlone),
                (Some(1), TextBlockPosition::Center),
                (Some(2), TextBlockPosition::Center),
                (Some(3), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );
    }

    #[test]
    fn leading_token_stays_stand_alone() {
        let text = "Liverlesion seen";
        let blocks = get_text_blocks(&mapping(&[("0", 0, 5), ("1", 5, 11)]), text).unwrap();
        assert_eq!(
            positions(&blocks),
            vec![
                (Some(0), TextBlockPosition::StandAlone),
                (Some(1), TextBlockPosition::Right),
                (None, TextBlockPosition::StandAlone),
            ]
        );

        let blocks = get_text_blocks(&mapping(&[("0", 0, 5), ("1", 6, 11)]), "Liver lesion").unwrap();
        assert_eq!(blocks[0].position, TextBlockPosition::StandAlone);
        assert_eq!(blocks[0].token, Some(0));
        assert_eq!(blocks[2].position, TextBlockPosition::StandAlone);
    }

    #[test]
    fn orders_tokens_numerically() {
        let text = "aa bb cc";
        let blocks = get_text_blocks(&mapping(&[("10", 6, 8), ("9", 3, 5), ("2", 0, 2)]), text).unwrap();
        let tokens = blocks.iter().filter_map(|block| block.token).collect::<Vec<_>>();
        assert_eq!(tokens, vec![2, 9, 10]);
        assert_eq!(joined(&blocks), text);
    }

    #[test]
    fn offsets_count_characters() {
        let text = "Hämatom – links";
        let blocks = get_text_blocks(&mapping(&[("0", 0, 7), ("1", 10, 15)]), text).unwrap();
        assert_eq!(blocks[0].text_string, "Hämatom");
        assert_eq!(blocks[1].text_string, " – ");
        assert_eq!(blocks[2].text_string, "links");
        assert_eq!(joined(&blocks), text);
    }

    #[test]
    fn rejects_malformed_token_id() {
        let error = get_text_blocks(&mapping(&[("1", 0, 1), ("one", 2, 3)]), "a b c").unwrap_err();
        assert_eq!(error, TextMappingError::MalformedTokenId("one".to_string()));
    }

    #[test]
    fn rejects_bad_ranges() {
        assert_eq!(
            get_text_blocks(&mapping(&[("0", 4, 2)]), "abcdef").unwrap_err(),
            TextMappingError::InvalidRange { token: 0, start: 4, end: 2 }
        );
        assert_eq!(
            get_text_blocks(&mapping(&[("0", 4, 9)]), "abcdef").unwrap_err(),
            TextMappingError::RangeOutOfBounds { token: 0, end: 9, text_len: 6 }
        );
        assert_eq!(
            get_text_blocks(&mapping(&[("0", 1, 4), ("1", 3, 5)]), "abcdef").unwrap_err(),
            TextMappingError::OverlappingRange { token: 1, start: 3, previous_end: 4 }
        );
    }

    #[test]
    fn css_classes() {
        assert_eq!(TextBlockPosition::StandAlone.css_class(), "keyword-highlight");
        assert_eq!(TextBlockPosition::Center.css_class(), "keyword-highlight-center");
    }
}
