//! Chunked observation harvest.
//!
//! A run fetches the reference data, replaces the destination collection,
//! then walks the source id span in fixed-size chunks. Source reads are
//! bounded by a semaphore sized `no_of_threads`; transform and write work
//! runs outside it.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::attribution::compute_attribution;
use crate::config::HarvestOptions;
use crate::model::{DataProvider, HarvestInfo, RunStatus};
use crate::source::HarvestSource;
use crate::store::{DestinationStore, Document};

pub mod reference;
pub mod transform;

pub use reference::ReferenceData;
pub use transform::VerbatimObservation;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("harvest canceled")]
    Canceled,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    FetchingReferenceData,
    Harvesting,
    Success,
    Canceled,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::FetchingReferenceData => "fetching_reference_data",
            Phase::Harvesting => "harvesting",
            Phase::Success => "success",
            Phase::Canceled => "canceled",
            Phase::Failed => "failed",
        }
    }
}

fn enter(phase: &mut Phase, next: Phase) {
    info!(from = phase.as_str(), to = next.as_str(), "harvest phase");
    *phase = next;
}

fn ensure_not_canceled(cancel: &CancellationToken) -> Result<(), HarvestError> {
    if cancel.is_cancelled() {
        Err(HarvestError::Canceled)
    } else {
        Ok(())
    }
}

type Store = Arc<dyn DestinationStore<VerbatimObservation>>;

pub struct SightingHarvester {
    data_provider: DataProvider,
    options: HarvestOptions,
    source: Arc<dyn HarvestSource>,
    store: Store,
}

impl SightingHarvester {
    pub fn new(
        data_provider: DataProvider,
        options: HarvestOptions,
        source: Arc<dyn HarvestSource>,
        store: Store,
    ) -> Self {
        Self {
            data_provider,
            options,
            source,
            store,
        }
    }

    /// Run one full harvest. Never fails; the outcome is in the returned
    /// `HarvestInfo`.
    #[instrument(skip_all, fields(provider = self.data_provider.as_str()))]
    pub async fn harvest(&self, cancel: CancellationToken) -> HarvestInfo {
        let mut harvest_info = HarvestInfo::new(
            VerbatimObservation::COLLECTION,
            self.data_provider,
            Utc::now(),
        );
        let mut phase = Phase::NotStarted;

        match self.run(&cancel, &mut phase).await {
            Ok(count) => {
                enter(&mut phase, Phase::Success);
                info!(count, "harvest succeeded");
                harvest_info.finish(RunStatus::Success, Some(count));
            }
            Err(HarvestError::Canceled) => {
                info!(phase = phase.as_str(), "harvest was canceled");
                enter(&mut phase, Phase::Canceled);
                harvest_info.finish(RunStatus::Canceled, None);
            }
            Err(HarvestError::Failed(err)) => {
                error!(?err, phase = phase.as_str(), "harvest failed");
                enter(&mut phase, Phase::Failed);
                harvest_info.finish(RunStatus::Failed, None);
            }
        }
        harvest_info
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        phase: &mut Phase,
    ) -> Result<usize, HarvestError> {
        enter(phase, Phase::FetchingReferenceData);
        ensure_not_canceled(cancel)?;
        let reference = Arc::new(
            ReferenceData::fetch(self.source.as_ref())
                .await
                .context("failed to fetch reference data")?,
        );

        ensure_not_canceled(cancel)?;
        self.store
            .delete_collection()
            .await
            .context("failed to delete destination collection")?;
        self.store
            .add_collection()
            .await
            .context("failed to create destination collection")?;

        let (min_id, max_id) = self
            .source
            .get_id_span()
            .await
            .context("failed to read sighting id span")?;

        enter(phase, Phase::Harvesting);
        info!(min_id, max_id, chunk_size = self.options.chunk_size, "id span");

        let chunk_size = self.options.chunk_size.max(1);
        let cap = self.options.max_number_of_sightings_harvested;
        let semaphore = Arc::new(Semaphore::new(self.options.no_of_threads.max(1)));
        let mut tasks = JoinSet::new();

        let mut current_id = min_id;
        while current_id <= max_id {
            if let Some(cap) = cap {
                if i64::from(current_id) - i64::from(min_id) >= i64::from(cap) {
                    info!(cap, "sighting cap reached");
                    break;
                }
            }
            if cancel.is_cancelled() {
                break;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => {
                    permit.context("chunk semaphore closed")?
                }
                _ = cancel.cancelled() => break,
            };

            let chunk = ChunkTask {
                source: self.source.clone(),
                store: self.store.clone(),
                reference: reference.clone(),
                start_id: current_id,
                count: chunk_size,
            };
            let cancel = cancel.clone();
            tasks.spawn(async move { chunk.run(permit, &cancel).await });

            current_id = match current_id.checked_add(chunk_size) {
                Some(next) => next,
                None => break,
            };
        }

        let mut total = 0;
        let mut failure: Option<anyhow::Error> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(count)) => total += count,
                Ok(Err(HarvestError::Canceled)) => {}
                Ok(Err(HarvestError::Failed(err))) => {
                    failure.get_or_insert(err);
                }
                Err(join_err) => {
                    failure.get_or_insert(anyhow!(join_err).context("chunk task panicked"));
                }
            }
        }

        ensure_not_canceled(cancel)?;
        if let Some(err) = failure {
            return Err(HarvestError::Failed(err));
        }
        Ok(total)
    }
}

struct ChunkTask {
    source: Arc<dyn HarvestSource>,
    store: Store,
    reference: Arc<ReferenceData>,
    start_id: i32,
    count: i32,
}

impl ChunkTask {
    #[instrument(skip_all, fields(start_id = self.start_id, count = self.count))]
    async fn run(
        self,
        permit: OwnedSemaphorePermit,
        cancel: &CancellationToken,
    ) -> Result<usize, HarvestError> {
        ensure_not_canceled(cancel)?;

        let sightings = self
            .source
            .get_chunk(self.start_id, self.count)
            .await
            .with_context(|| format!("failed to fetch chunk starting at {}", self.start_id))?;
        let sighting_ids: HashSet<i32> = sightings.iter().map(|s| s.id).collect();
        let relations = if sighting_ids.is_empty() {
            Vec::new()
        } else {
            self.source
                .get_relations(&sighting_ids)
                .await
                .with_context(|| {
                    format!(
                        "failed to fetch relations for chunk starting at {}",
                        self.start_id
                    )
                })?
        };
        drop(permit);

        if sightings.is_empty() {
            return Ok(0);
        }

        let collection_items = self.reference.collection_items_for(&sighting_ids);
        let attribution = compute_attribution(
            &sighting_ids,
            &self.reference.person_by_user_id,
            &self.reference.organization_by_id,
            &collection_items,
            &relations,
        );
        let observations: Vec<VerbatimObservation> = sightings
            .iter()
            .map(|s| transform::to_verbatim(s, attribution.get(&s.id), &self.reference))
            .collect();

        let written = self
            .store
            .add_many(&observations)
            .await
            .with_context(|| format!("failed to store chunk starting at {}", self.start_id))?;
        info!(written, "chunk harvested");
        Ok(written)
    }
}
