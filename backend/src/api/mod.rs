//! Report API functions and module exports.

pub mod reports;
