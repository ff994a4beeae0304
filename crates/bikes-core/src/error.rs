use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the bike-counter pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The expected source file does not exist.
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No raw export matching the naming pattern was found.
    #[error("No raw data files found in {0}")]
    NoRawFiles(PathBuf),

    /// Neither the time-series nor the snapshot column set could be inferred.
    #[error("Could not infer timestamp/count columns from: {}", columns.join(", "))]
    UnresolvableSchema { columns: Vec<String> },

    /// The input bytes could not be decoded with any supported encoding.
    #[error("Could not decode {path} as UTF-8 or Latin-1")]
    Encoding { path: PathBuf },

    /// A CSV document could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// None of the dashboard dataset candidates exist.
    #[error("No dataset found in {0}")]
    DatasetNotFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// `true` for the errors that abort a batch run without writing output.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingInput(_)
                | PipelineError::NoRawFiles(_)
                | PipelineError::UnresolvableSchema { .. }
                | PipelineError::Encoding { .. }
        )
    }
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, PipelineError>;
