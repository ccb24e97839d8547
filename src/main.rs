use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

mod cli;
mod config;
mod embedding;
mod events;
mod mining;
mod orchestrator;
mod similarity;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use embedding::EmbeddingService;
use events::{ArchetypeCatalog, EventDetector, UserSignals};
use mining::{CsvTransactionSource, JsonFileSink};
use orchestrator::{MiningRun, MlOrchestrator};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.data_dir);
    let data_dir = PathBuf::from(&args.data_dir);

    match args.command {
        cli::Command::Daemon { listen } => {
            let orchestrator = Arc::new(MlOrchestrator::new(
                &config,
                data_dir.clone(),
                Arc::new(CsvTransactionSource::new(data_dir.join("bookings.csv"))),
                Arc::new(JsonFileSink::new(data_dir.join("copurchase_rules.json"))),
            ));
            web::start_daemon(orchestrator, listen);
        }

        cli::Command::Mine {
            bookings,
            out,
            event_type,
            window_days,
        } => {
            let orchestrator = MlOrchestrator::new(
                &config,
                data_dir,
                Arc::new(CsvTransactionSource::new(bookings)),
                Arc::new(JsonFileSink::new(out)),
            );

            match orchestrator.run_daily_jobs(event_type.as_deref(), window_days) {
                MiningRun::Completed { rules } => {
                    println!("{} rules emitted", rules);
                }
                MiningRun::Aborted => {
                    anyhow::bail!("mining run aborted, previous snapshot left in place");
                }
                MiningRun::InFlight => unreachable!("single invocation cannot overlap itself"),
            }
        }

        cli::Command::Embed { texts } => {
            let service = EmbeddingService::new(&config.embedding, data_dir);
            let vectors = service.embed_batch(&texts)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "dimensions": service.dimensions(),
                    "degraded": service.is_degraded(),
                    "vectors": vectors,
                }))?
            );
        }

        cli::Command::Detect {
            searches,
            viewed,
            booked,
        } => {
            let detector =
                EventDetector::new(ArchetypeCatalog::builtin(), config.detection.clone());
            let events = detector.detect(&UserSignals {
                recent_searches: searches,
                viewed_categories: viewed,
                booked_categories: booked,
            });
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    Ok(())
}
