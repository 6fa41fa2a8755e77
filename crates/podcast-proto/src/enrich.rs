//! Detail enrichment: the N+1 fan-out.
//!
//! Every summary gets its own detail request. Requests run as independent
//! tasks in a `JoinSet`, gated by a semaphore so large catalogs don't flood
//! the source. Each task reports its slot index, so the merged catalog keeps
//! summary order no matter which request settles first. A failed request
//! degrades that one show to its summary; it never aborts the batch.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{dedup_summaries, Show, ShowSummary};
use crate::error::CatalogError;
use crate::source::CatalogSource;

pub async fn enrich<S: CatalogSource>(
    source: Arc<S>,
    summaries: Vec<ShowSummary>,
    max_in_flight: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Show>, CatalogError> {
    let total = summaries.len();
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut slots: Vec<Option<Show>> = (0..total).map(|_| None).collect();
    let mut tasks = JoinSet::new();

    for (idx, summary) in summaries.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let show = match source.fetch_detail(&summary.id).await {
                Ok(detail) => Show::merge(summary, detail),
                Err(e) => {
                    warn!("Detail fetch for show {} failed, using summary: {}", summary.id, e);
                    Show::from_summary(summary)
                }
            };
            (idx, show)
        });
    }

    let mut enriched = 0usize;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tasks.abort_all();
                info!("Enrichment cancelled with {}/{} shows settled", enriched, total);
                return Err(CatalogError::Cancelled);
            }
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((idx, show))) => {
                    slots[idx] = Some(show);
                    enriched += 1;
                }
                // Slot stays empty and falls back below
                Some(Err(e)) => error!("Detail task failed: {}", e),
            }
        }
    }

    debug!("Enrichment settled {}/{} shows", enriched, total);

    Ok(slots
        .into_iter()
        .zip(summaries)
        .map(|(slot, summary)| slot.unwrap_or_else(|| Show::from_summary(summary)))
        .collect())
}

/// Full pipeline: fetch the index, drop duplicate ids, enrich.
///
/// A failed index fetch is fatal to the load. Cancellation is honoured
/// while the index is in flight too.
pub async fn load_catalog<S: CatalogSource>(
    source: Arc<S>,
    max_in_flight: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Show>, CatalogError> {
    let summaries = tokio::select! {
        _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
        fetched = source.fetch_catalog() => fetched?,
    };
    info!("Fetched catalog index: {} shows", summaries.len());

    let summaries = dedup_summaries(summaries);
    enrich(source, summaries, max_in_flight, cancel).await
}
