//! Locating RadGraph tokens in the text the user uploaded.

pub mod radgraph_text_mapper;
