use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::columns::ColumnCandidates;
use crate::error::{PipelineError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Copenhagen bike-counter pipeline and dashboard
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cph-bikes",
    about = "Copenhagen bike-counter pipeline and dashboard",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline config file (defaults to ~/.cph-bikes/config.json)
    #[arg(long, global = true, env = "CPH_BIKES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Pipeline stages and the dashboard.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Copy a raw traffic export into the dated raw-data location
    Ingest {
        /// Source CSV export
        #[arg(env = "CPH_SOURCE_PATH")]
        source: PathBuf,
        /// Raw-data directory (defaults to <data_dir>/raw)
        raw_dir: Option<PathBuf>,
    },

    /// Normalize a raw export and write the daily aggregate table
    Transform {
        /// Raw CSV export
        input: PathBuf,
        /// Directory receiving the aggregate file
        output_dir: PathBuf,
    },

    /// Add calendar and synthetic weather columns to a daily aggregate table
    Enrich {
        /// Daily aggregate CSV
        input: PathBuf,
        /// Directory receiving the enriched file
        output_dir: PathBuf,
        /// Seed for the synthetic weather generator
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run ingest then transform once, with the configured retry policy
    Run {
        /// Source CSV export
        #[arg(long, env = "CPH_SOURCE_PATH")]
        source: PathBuf,
        /// Data root holding raw/ and curated/
        #[arg(long, env = "CPH_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Run the pipeline every day at the configured UTC time
    Schedule {
        /// Source CSV export
        #[arg(long, env = "CPH_SOURCE_PATH")]
        source: PathBuf,
        /// Data root holding raw/ and curated/
        #[arg(long, env = "CPH_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Open the terminal dashboard
    Dashboard {
        /// Data root holding curated/
        #[arg(long, env = "CPH_DATA_DIR")]
        data_dir: Option<PathBuf>,
        /// Display theme
        #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
        theme: String,
    },
}

impl Settings {
    /// Effective log level, with `--debug` overriding `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Load and validate the pipeline config named by `--config`, or the
    /// default one.
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(PipelineConfig::config_path);
        let config = PipelineConfig::load_from(&path)?;
        config.validate()?;
        Ok(config)
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Retry policy applied to each pipeline task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            delay_secs: 300,
        }
    }
}

/// Daily trigger time (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 4, minute: 10 }
    }
}

/// Pipeline configuration persisted at `~/.cph-bikes/config.json`.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Data root; raw exports live in `raw/`, outputs in `curated/`.
    pub data_dir: PathBuf,
    /// Calendar day assigned to every AADT snapshot row.
    pub snapshot_date: NaiveDate,
    /// File name of the daily aggregate output.
    pub output_file_name: String,
    /// Prefix of dated raw exports written by ingest.
    pub raw_file_prefix: String,
    /// Seed for synthetic weather enrichment.
    pub enrichment_seed: u64,
    pub retry: RetryConfig,
    pub schedule: ScheduleConfig,
    /// Column candidate lists used for inference.
    pub columns: ColumnCandidates,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            snapshot_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            output_file_name: "daily_counts.csv".to_string(),
            raw_file_prefix: "cph_traffic_raw_".to_string(),
            enrichment_seed: 42,
            retry: RetryConfig::default(),
            schedule: ScheduleConfig::default(),
            columns: ColumnCandidates::default(),
        }
    }
}

impl PipelineConfig {
    /// Return the default path to the config file.
    /// Uses `~/.cph-bikes/config.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".cph-bikes").join("config.json")
    }

    /// Load the config from an explicit path.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PipelineError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomically write the config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(PipelineError::Config(format!(
                "schedule {:02}:{:02} is not a valid time of day",
                self.schedule.hour, self.schedule.minute
            )));
        }
        let name = self.output_file_name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(PipelineError::Config(format!(
                "output_file_name \"{}\" must be a bare file name",
                self.output_file_name
            )));
        }
        if self.raw_file_prefix.is_empty() {
            return Err(PipelineError::Config(
                "raw_file_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory receiving dated raw exports.
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Directory receiving aggregate outputs.
    pub fn curated_dir(&self) -> PathBuf {
        self.data_dir.join("curated")
    }

    /// Same config rooted at another data directory.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
