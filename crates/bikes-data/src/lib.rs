//! Data layer for the Copenhagen bike-counter pipeline.
//!
//! Reads heterogeneous CSV traffic exports, infers which columns carry the
//! timestamp, count and counter identity, normalizes rows to a canonical
//! shape, aggregates them per day and counter, and writes the result. Also
//! hosts the ingest step, the calendar/weather enrichment and the pure
//! analysis views the dashboard renders.

pub mod aggregator;
pub mod analysis;
pub mod enrich;
pub mod inference;
pub mod ingest;
pub mod normalizer;
pub mod reader;
pub mod transform;
pub mod writer;

pub use bikes_core as core;
