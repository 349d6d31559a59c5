//! External blacklist source sync handler: fetches the source's feed
//! body and hands it to [`autoguard_blacklist::SourceSync`], which owns
//! the actual re-ingestion and re-materialize per §4.C.

use std::sync::Arc;

use autoguard_blacklist::SourceSync;
use autoguard_store::Database;
use chrono::Utc;
use tracing::info;

use crate::collaborators::HttpScraper;
use crate::error::{JobError, JobResult};
use crate::job::SourceSyncJob;

pub async fn handle(
    job: &SourceSyncJob,
    store: &Database,
    sync: &SourceSync,
    scraper: &Arc<dyn HttpScraper>,
) -> JobResult<()> {
    let source = store.sources().find_by_id(job.source_id).await?;
    let url = source
        .url
        .as_deref()
        .ok_or_else(|| JobError::Validation(format!("source {} has no url", job.source_id)))?;

    store.sources().mark_syncing(job.source_id).await?;

    let fetch_result = scraper.fetch_page(url).await;
    let body = match fetch_result {
        Ok(page) => page.html,
        Err(error) => {
            let message = error.to_string();
            store.sources().mark_sync_failed(job.source_id, &message).await?;
            return Err(JobError::Transient(format!("source fetch failed: {message}")));
        }
    };

    let outcome = sync.sync_source(job.source_id, &body).await;
    match outcome {
        Ok(outcome) => {
            let next_sync_at = autoguard_store::sources::Sources::next_due_at(
                source.update_frequency,
                Utc::now(),
            );
            store.sources().mark_synced(job.source_id, next_sync_at).await?;
            info!(
                source_id = job.source_id,
                ips = outcome.ips_ingested,
                cidrs = outcome.cidrs_ingested,
                dropped = outcome.dropped,
                "blacklist source sync completed"
            );
            Ok(())
        }
        Err(error) => {
            let message = error.to_string();
            store.sources().mark_sync_failed(job.source_id, &message).await?;
            Err(JobError::Transient(format!("source ingest failed: {message}")))
        }
    }
}
