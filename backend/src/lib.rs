//! Annotation pipeline for uploaded radiology reports.

pub mod api;
pub mod config;
pub mod text_mapping;
