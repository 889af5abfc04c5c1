//! Report data shared by the annotation pipeline and the report page.

extern crate serde;


pub mod text_mapping;
pub mod processed_annotations;
pub mod report_document;
pub mod report_view;
pub mod explanation;
pub mod document_paths;
