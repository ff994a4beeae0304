//! Shared domain types for the Copenhagen bike-counter pipeline.
//!
//! Holds the record models, the error taxonomy, the named column candidate
//! lists, CLI/config settings and small time and number helpers used by the
//! data, runtime and UI crates.

pub mod columns;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{PipelineError, Result};
