use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use species_harvest::config;
use species_harvest::db;
use species_harvest::model::RunStatus;
use species_harvest::source::SpeciesPortalSource;
use species_harvest::store::{self, SqliteCollection};
use species_harvest::vocabulary::{harvest_vocabularies, Vocabulary};

#[derive(Debug, Parser)]
#[command(author, version, about = "Build controlled vocabularies and store them")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let source_pool = db::connect(&cfg.source_url()).await?;
    let destination_pool = db::connect(&cfg.destination_url()).await?;
    db::run_migrations(&destination_pool).await?;

    let source = SpeciesPortalSource::new(source_pool);
    let vocabularies = SqliteCollection::<Vocabulary>::new(destination_pool.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling vocabulary build");
            on_signal.cancel();
        }
    });

    let harvest_info =
        harvest_vocabularies(&source, &vocabularies, cfg.source.data_provider, &cancel).await;
    store::save_harvest_info(&destination_pool, &harvest_info).await?;

    match harvest_info.status {
        Some(RunStatus::Failed) => bail!("vocabulary build failed"),
        status => {
            info!(?status, count = harvest_info.count, "vocabulary build finished");
            Ok(())
        }
    }
}
