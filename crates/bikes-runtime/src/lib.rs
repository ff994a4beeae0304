//! Runtime orchestration layer for the bike-counter pipeline.
//!
//! Runs the daily ingest → transform chain with retries on a UTC schedule,
//! and serves memoized datasets to the dashboard.

pub mod data_manager;
pub mod pipeline;

pub use bikes_core as core;
pub use bikes_data as data;
