//! Dataset discovery and memoized loading for the dashboard.
//!
//! The dashboard reads the richest dataset available under the data
//! directory. Loaded records are kept until the file's fingerprint (path,
//! modification time, size) changes, so a pipeline run that rewrites the
//! file is picked up on the next [`DatasetManager::load`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use bikes_core::error::{PipelineError, Result};
use bikes_core::models::DashboardRecord;
use bikes_data::writer::read_dashboard_records;
use tracing::{debug, info, warn};

// ── DatasetKind ───────────────────────────────────────────────────────────────

/// Provenance of a discovered dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Daily table with calendar and synthetic weather columns.
    EnrichedWithWeather,
    /// Real counter data without enrichment.
    Real,
    /// Output of the transform step.
    PipelineOutput,
    /// Generated fixture data.
    Synthetic,
}

impl DatasetKind {
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::EnrichedWithWeather => "real data + weather",
            DatasetKind::Real => "real data",
            DatasetKind::PipelineOutput => "pipeline output",
            DatasetKind::Synthetic => "synthetic",
        }
    }
}

/// Dataset files in preference order.
pub const DATASET_CANDIDATES: &[(&str, DatasetKind)] = &[
    (
        "real_copenhagen_data_with_weather_fixed.csv",
        DatasetKind::EnrichedWithWeather,
    ),
    (
        "real_copenhagen_data_with_weather.csv",
        DatasetKind::EnrichedWithWeather,
    ),
    ("clean_real_copenhagen_data.csv", DatasetKind::Real),
    ("daily_counts.csv", DatasetKind::PipelineOutput),
    ("real_daily_counts.csv", DatasetKind::Synthetic),
];

// ── Dataset ───────────────────────────────────────────────────────────────────

/// A loaded dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub kind: DatasetKind,
    pub records: Arc<Vec<DashboardRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    path: PathBuf,
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|source| PipelineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

// ── DatasetManager ────────────────────────────────────────────────────────────

/// Memoizing loader over the dataset candidates of one data directory.
///
/// Each candidate is looked up in `<data_dir>/curated` first, then directly
/// in `<data_dir>`.
pub struct DatasetManager {
    data_dir: PathBuf,
    cache: Option<(Fingerprint, Dataset)>,
    last_error: Option<String>,
}

impl DatasetManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: None,
            last_error: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Locate the preferred dataset without loading it.
    pub fn discover(&self) -> Result<(PathBuf, DatasetKind)> {
        let dirs = [self.data_dir.join("curated"), self.data_dir.clone()];
        for (name, kind) in DATASET_CANDIDATES {
            for dir in &dirs {
                let path = dir.join(name);
                if path.is_file() {
                    debug!("found {} dataset at {}", kind.label(), path.display());
                    return Ok((path, *kind));
                }
            }
        }
        Err(PipelineError::DatasetNotFound(self.data_dir.clone()))
    }

    /// Load the preferred dataset, reusing the cached records while the file
    /// is unchanged.
    ///
    /// On a failed reload the previous dataset (if any) is kept and returned;
    /// the error is available from [`last_error`](Self::last_error).
    pub fn load(&mut self) -> Result<Dataset> {
        match self.load_fresh() {
            Ok(dataset) => {
                self.last_error = None;
                Ok(dataset)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                match &self.cache {
                    Some((_, cached)) => {
                        warn!(error = %e, "reload failed; keeping previous dataset");
                        Ok(cached.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn load_fresh(&mut self) -> Result<Dataset> {
        let (path, kind) = self.discover()?;
        let fingerprint = Fingerprint::of(&path)?;

        if let Some((cached_fp, dataset)) = &self.cache {
            if *cached_fp == fingerprint {
                debug!("dataset unchanged; using cached records");
                return Ok(dataset.clone());
            }
        }

        let records = read_dashboard_records(&path)?;
        info!(
            rows = records.len(),
            "Loaded {} dataset from {}",
            kind.label(),
            path.display()
        );
        let dataset = Dataset {
            path,
            kind,
            records: Arc::new(records),
        };
        self.cache = Some((fingerprint, dataset.clone()));
        Ok(dataset)
    }

    /// Drop the cached dataset so the next load re-reads from disk.
    pub fn invalidate(&mut self) {
        self.cache = None;
        debug!("dataset cache invalidated");
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
