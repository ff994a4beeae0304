//! Terminal dashboard for the Copenhagen bike-counter datasets.
//!
//! Provides themes, the header, metric card and share bar components, trend
//! and ranking charts, breakdown tables, and the application event loop built
//! on top of [`ratatui`].

pub mod app;
pub mod charts;
pub mod components;
pub mod table_view;
pub mod themes;

pub use bikes_core as core;
