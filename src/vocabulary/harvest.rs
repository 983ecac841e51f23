use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use super::builder::{build_vocabulary, definitions};
use super::Vocabulary;
use crate::harvest::HarvestError;
use crate::model::{DataProvider, HarvestInfo, RunStatus};
use crate::source::MetadataSource;
use crate::store::{DestinationStore, Document};

/// Vocabularies built concurrently; results are still consumed in order.
const PARALLEL_BUILDS: usize = 4;

/// Build every vocabulary and replace the stored collection with the result.
#[instrument(skip_all)]
pub async fn harvest_vocabularies(
    source: &dyn MetadataSource,
    store: &dyn DestinationStore<Vocabulary>,
    data_provider: DataProvider,
    cancel: &CancellationToken,
) -> HarvestInfo {
    let mut harvest_info = HarvestInfo::new(Vocabulary::COLLECTION, data_provider, Utc::now());
    match run(source, store, cancel).await {
        Ok(count) => {
            info!(count, "vocabulary harvest succeeded");
            harvest_info.finish(RunStatus::Success, Some(count));
        }
        Err(HarvestError::Canceled) => {
            info!("vocabulary harvest was canceled");
            harvest_info.finish(RunStatus::Canceled, None);
        }
        Err(HarvestError::Failed(err)) => {
            error!(?err, "vocabulary harvest failed");
            harvest_info.finish(RunStatus::Failed, None);
        }
    }
    harvest_info
}

async fn run(
    source: &dyn MetadataSource,
    store: &dyn DestinationStore<Vocabulary>,
    cancel: &CancellationToken,
) -> Result<usize, HarvestError> {
    let mut builds = stream::iter(definitions())
        .map(|def| async move { (def.id, build_vocabulary(def, source).await) })
        .buffered(PARALLEL_BUILDS);

    let mut vocabularies = Vec::new();
    while let Some((id, result)) = builds.next().await {
        if cancel.is_cancelled() {
            return Err(HarvestError::Canceled);
        }
        let built = result.with_context(|| format!("failed to build vocabulary {}", id.as_str()))?;
        match built {
            Some(vocabulary) => vocabularies.push(vocabulary),
            None => info!(vocabulary = id.as_str(), "no values, vocabulary skipped"),
        }
    }

    if cancel.is_cancelled() {
        return Err(HarvestError::Canceled);
    }
    store
        .delete_collection()
        .await
        .context("failed to delete vocabulary collection")?;
    store
        .add_collection()
        .await
        .context("failed to create vocabulary collection")?;
    let written = store
        .add_many(&vocabularies)
        .await
        .context("failed to store vocabularies")?;
    Ok(written)
}
