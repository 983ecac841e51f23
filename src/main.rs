use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use species_harvest::config;
use species_harvest::db;
use species_harvest::harvest::{SightingHarvester, VerbatimObservation};
use species_harvest::model::RunStatus;
use species_harvest::source::SpeciesPortalSource;
use species_harvest::store::{self, SqliteCollection};

#[derive(Debug, Parser)]
#[command(author, version, about = "Harvest species observations into the destination store")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Stop after this many sighting ids (overrides harvest.max_number_of_sightings_harvested)
    #[arg(long)]
    max_sightings: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(Some(&args.config))?;
    if args.max_sightings.is_some() {
        cfg.harvest.max_number_of_sightings_harvested = args.max_sightings;
        config::validate(&cfg)?;
    }
    cfg.ensure_dirs()?;

    let source_pool = db::connect(&cfg.source_url()).await?;
    let destination_pool = db::connect(&cfg.destination_url()).await?;
    db::run_migrations(&destination_pool).await?;

    let harvester = SightingHarvester::new(
        cfg.source.data_provider,
        cfg.harvest.clone(),
        Arc::new(SpeciesPortalSource::new(source_pool)),
        Arc::new(SqliteCollection::<VerbatimObservation>::new(
            destination_pool.clone(),
        )),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling harvest");
            on_signal.cancel();
        }
    });

    info!(
        provider = cfg.source.data_provider.as_str(),
        chunk_size = cfg.harvest.chunk_size,
        threads = cfg.harvest.no_of_threads,
        "starting harvest"
    );
    let harvest_info = harvester.harvest(cancel).await;
    store::save_harvest_info(&destination_pool, &harvest_info).await?;

    match harvest_info.status {
        Some(RunStatus::Failed) => bail!("harvest failed"),
        status => {
            info!(?status, count = harvest_info.count, "harvest finished");
            Ok(())
        }
    }
}
