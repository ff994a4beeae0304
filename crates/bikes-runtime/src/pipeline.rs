//! Daily ingest → transform orchestration.
//!
//! Two tasks run in order. Each is retried per [`RetryPolicy`]; when the
//! first exhausts its attempts the second is never started. Scheduled runs
//! fire once a day at a fixed UTC time and missed triggers are not caught
//! up.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use bikes_core::error::Result;
use bikes_core::settings::{PipelineConfig, RetryConfig, ScheduleConfig};
use bikes_data::ingest::{ingest_file, IngestReport};
use bikes_data::reader::find_latest_file;
use bikes_data::transform::{run_transform, TransformReport};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{error, info, warn};

// ── RetryPolicy ───────────────────────────────────────────────────────────────

/// Fixed-delay retry policy for one pipeline task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            retries: cfg.retries,
            delay: Duration::from_secs(cfg.delay_secs),
        }
    }
}

/// Run `f` until it succeeds or `policy.retries` extra attempts have failed,
/// sleeping `policy.delay` between attempts. Returns the last error.
pub fn run_with_retry<T, F>(task: &str, policy: &RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.retries + 1;
    let mut attempt = 1;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    task,
                    attempt,
                    error = %e,
                    "task failed; retrying in {}s",
                    policy.delay.as_secs()
                );
                thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => {
                error!(task, attempt, error = %e, "task failed; giving up");
                return Err(e);
            }
        }
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Daily trigger time in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for Schedule {
    fn from(cfg: &ScheduleConfig) -> Self {
        Self {
            hour: cfg.hour,
            minute: cfg.minute,
        }
    }
}

impl Schedule {
    fn trigger_on(&self, day: NaiveDate) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&day.and_time(time))
    }

    /// First trigger strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.trigger_on(now.date_naive());
        if today > now {
            return today;
        }
        let tomorrow = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);
        self.trigger_on(tomorrow)
    }
}

// ── DailyPipeline ─────────────────────────────────────────────────────────────

/// What one successful daily run produced.
#[derive(Debug, Clone)]
pub struct PipelineRunReport {
    pub ingest: IngestReport,
    pub transform: TransformReport,
}

/// The ingest → transform chain bound to a source file and a config.
#[derive(Debug, Clone)]
pub struct DailyPipeline {
    source: PathBuf,
    config: PipelineConfig,
    retry: RetryPolicy,
    schedule: Schedule,
}

impl DailyPipeline {
    pub fn new(source: PathBuf, config: PipelineConfig) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        let schedule = Schedule::from(&config.schedule);
        Self {
            source,
            config,
            retry,
            schedule,
        }
    }

    /// Override the retry policy from the config.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Run ingest then transform once, stamping the raw export with `run_date`.
    pub fn run_once(&self, run_date: NaiveDate) -> Result<PipelineRunReport> {
        let raw_dir = self.config.raw_dir();
        let prefix = self.config.raw_file_prefix.as_str();

        let ingest = run_with_retry("ingest", &self.retry, || {
            ingest_file(&self.source, &raw_dir, prefix, run_date)
        })?;

        let transform = run_with_retry("transform", &self.retry, || {
            let latest = find_latest_file(&raw_dir, prefix, "csv")?;
            info!("Processing raw data: {}", latest.display());
            run_transform(&latest, &self.config.curated_dir(), &self.config)
        })?;

        info!(
            rows = transform.aggregates,
            "Daily run for {} complete: {}",
            run_date,
            transform.output_path.display()
        );
        Ok(PipelineRunReport { ingest, transform })
    }

    /// Sleep until `trigger`, then run once on the blocking pool.
    pub async fn run_at(&self, trigger: DateTime<Utc>) -> Result<PipelineRunReport> {
        let wait = (trigger - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!("Next run at {} (in {}s)", trigger, wait.as_secs());
        tokio::time::sleep(wait).await;

        let pipeline = self.clone();
        let run_date = trigger.date_naive();
        tokio::task::spawn_blocking(move || pipeline.run_once(run_date))
            .await
            .map_err(std::io::Error::from)?
    }

    /// Run forever on the daily schedule. A failed run is logged and the
    /// loop waits for the next trigger.
    pub async fn run_scheduled(&self) {
        info!(
            "Scheduled daily at {:02}:{:02} UTC",
            self.schedule.hour, self.schedule.minute
        );
        loop {
            let trigger = self.schedule.next_run_after(Utc::now());
            if let Err(e) = self.run_at(trigger).await {
                error!(error = %e, "daily run failed");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bikes_core::error::PipelineError;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn no_delay(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::ZERO,
        }
    }

    fn pipeline_in(tmp: &TempDir, source_content: Option<&str>) -> DailyPipeline {
        let source = tmp.path().join("source.csv");
        if let Some(content) = source_content {
            std::fs::write(&source, content).unwrap();
        }
        let config = PipelineConfig::default().with_data_dir(Some(tmp.path().join("data")));
        DailyPipeline::new(source, config).with_retry(no_delay(1))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── run_with_retry ────────────────────────────────────────────────────────

    #[test]
    fn test_retry_succeeds_on_second_attempt() {
        let calls = Cell::new(0);
        let result = run_with_retry("t", &no_delay(1), || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(PipelineError::Config("flaky".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_gives_up_after_policy() {
        let calls = Cell::new(0);
        let result: Result<()> = run_with_retry("t", &no_delay(1), || {
            calls.set(calls.get() + 1);
            Err(PipelineError::Config("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.retries, 1);
        assert_eq!(p.delay, Duration::from_secs(300));
    }

    // ── Schedule ──────────────────────────────────────────────────────────────

    #[test]
    fn test_next_run_later_today() {
        let s = Schedule::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        assert_eq!(
            s.next_run_after(now),
            Utc.with_ymd_and_hms(2024, 5, 1, 4, 10, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_tomorrow_when_passed() {
        let s = Schedule::default();
        let at_trigger = Utc.with_ymd_and_hms(2024, 5, 1, 4, 10, 0).unwrap();
        assert_eq!(
            s.next_run_after(at_trigger),
            Utc.with_ymd_and_hms(2024, 5, 2, 4, 10, 0).unwrap()
        );
        let month_end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap();
        assert_eq!(
            s.next_run_after(month_end),
            Utc.with_ymd_and_hms(2024, 2, 1, 4, 10, 0).unwrap()
        );
    }

    // ── run_once ──────────────────────────────────────────────────────────────

    #[test]
    fn test_run_once_ingests_and_transforms() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline_in(&tmp, Some("date,bike\n2024-01-01,10\n2024-01-01,15\n"));

        let report = pipeline.run_once(date(2024, 1, 3)).unwrap();
        assert!(report
            .ingest
            .output_path
            .ends_with("raw/cph_traffic_raw_20240103.csv"));
        assert_eq!(report.transform.grand_total, 25);
        assert!(tmp.path().join("data/curated/daily_counts.csv").exists());
    }

    #[test]
    fn test_run_once_skips_transform_when_ingest_fails() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline_in(&tmp, None);

        let err = pipeline.run_once(date(2024, 1, 3)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(!tmp.path().join("data/curated").exists());
    }

    #[test]
    fn test_transform_uses_latest_raw_file() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline_in(&tmp, Some("date,bike\n2024-02-01,4\n"));
        let raw = tmp.path().join("data/raw");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::write(raw.join("cph_traffic_raw_20200101.csv"), "date,bike\n2020-01-01,999\n")
            .unwrap();

        let report = pipeline.run_once(date(2024, 2, 2)).unwrap();
        assert_eq!(report.transform.grand_total, 4);
    }

    // ── run_at ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_at_past_trigger_runs_immediately() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline_in(&tmp, Some("date,bike\n2024-01-01,10\n"));
        let trigger = Utc::now() - chrono::Duration::seconds(1);

        let report = pipeline.run_at(trigger).await.unwrap();
        assert_eq!(report.transform.aggregates, 1);
    }
}
