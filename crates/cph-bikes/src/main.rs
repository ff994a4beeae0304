mod bootstrap;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use bikes_core::settings::{Command, Settings};
use bikes_data::enrich::enrich_file;
use bikes_data::ingest::ingest_file;
use bikes_data::transform::run_transform;
use bikes_runtime::pipeline::DailyPipeline;
use bikes_ui::app::run_dashboard;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    let app_dir = bootstrap::ensure_directories()?;
    let log_file = match (&settings.log_file, &settings.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Command::Dashboard { .. }) => Some(bootstrap::dashboard_log_file(&app_dir)),
        (None, _) => None,
    };
    bootstrap::setup_logging(settings.effective_log_level(), log_file.as_ref())?;

    info!("cph-bikes v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.load_config()?;

    match settings.command {
        Command::Ingest { source, raw_dir } => {
            let raw_dir = raw_dir.unwrap_or_else(|| config.raw_dir());
            let report = ingest_file(
                &source,
                &raw_dir,
                &config.raw_file_prefix,
                Utc::now().date_naive(),
            )?;
            println!("{}", report.output_path.display());
        }

        Command::Transform { input, output_dir } => {
            let report = run_transform(&input, &output_dir, &config)?;
            info!(
                schema = %report.schema,
                rows = report.rows_read,
                "Dropped: {}",
                report.drops
            );
            println!("{}", report.output_path.display());
        }

        Command::Enrich {
            input,
            output_dir,
            seed,
        } => {
            let seed = seed.unwrap_or(config.enrichment_seed);
            let report = enrich_file(&input, &output_dir, seed)?;
            println!("{}", report.output_path.display());
        }

        Command::Run { source, data_dir } => {
            let pipeline = DailyPipeline::new(source, config.with_data_dir(data_dir));
            let today = Utc::now().date_naive();
            let report = tokio::task::spawn_blocking(move || pipeline.run_once(today)).await??;
            println!("{}", report.transform.output_path.display());
        }

        Command::Schedule { source, data_dir } => {
            let pipeline = DailyPipeline::new(source, config.with_data_dir(data_dir));
            tokio::select! {
                _ = pipeline.run_scheduled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received; stopping scheduler");
                }
            }
        }

        Command::Dashboard { data_dir, theme } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            info!("Opening dashboard over {}", data_dir.display());
            run_dashboard(data_dir, &theme).await?;
        }
    }

    Ok(())
}
