use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::sync::Arc;

use waqt::cli::args::{Cli, Commands};
use waqt::cli::handlers;
use waqt::config::AppConfig;
use waqt::db::migrations::run_migrations;
use waqt::db::SqliteStore;
use waqt::prayer_times::{
    AladhanClient, AlwaysOnline, ConnectivityProbe, PrayerTimesClient, TcpProbe,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Loading config")?;

    // Ensure data directory exists and open DB
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;

    let client = build_client(&config, conn)?;
    client.restore_sample_data_mode().await;

    match cli.command.unwrap_or(Commands::Times {
        date: None,
        json: false,
    }) {
        Commands::Times { date, json } => {
            handlers::handle_times(&client, &config, date.as_deref(), json).await?;
        }
        Commands::Month {
            year,
            month,
            city,
            country,
            json,
        } => {
            let by_city = city.as_deref().zip(country.as_deref());
            handlers::handle_month(&client, &config, year, month, by_city, json).await?;
        }
        Commands::Batch { dates, json } => {
            handlers::handle_batch(&client, &config, &dates, json).await?;
        }
        Commands::Methods => {
            handlers::handle_methods(&config)?;
        }
        Commands::Adjust { prayer, minutes } => {
            handlers::handle_adjust(&mut config, &prayer, minutes)?;
        }
        Commands::Sample { action } => {
            handlers::handle_sample(&client, action).await?;
        }
        Commands::Cache { action } => {
            handlers::handle_cache(&client, &action).await?;
        }
    }

    Ok(())
}

fn build_client(config: &AppConfig, conn: Connection) -> Result<PrayerTimesClient> {
    let api = AladhanClient::new(&config.api.base_url)
        .context("Building HTTP client")?
        .with_timeouts(config.day_timeout(), config.calendar_timeout())
        .with_timezone(config.api.timezone.clone());

    let probe: Arc<dyn ConnectivityProbe> =
        match TcpProbe::for_url(&config.api.base_url, config.probe_timeout()) {
            Some(probe) => Arc::new(probe),
            None => {
                log::warn!(
                    "Cannot derive probe target from {}, assuming online",
                    config.api.base_url
                );
                Arc::new(AlwaysOnline)
            }
        };

    Ok(PrayerTimesClient::new(
        config.client_config(),
        Arc::new(api),
        probe,
        Arc::new(SqliteStore::new(conn)),
    ))
}
