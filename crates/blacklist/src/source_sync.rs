use std::sync::Arc;

use autoguard_store::models::RuleFamily;
use autoguard_store::Database;
use tracing::info;

use crate::error::MaterializeResult;
use crate::ingest::{self, ParsedEntry};
use crate::materializer::Materializer;

/// Re-ingests one external blacklist source: deactivates every A-row
/// tagged with `source:<id>` inside a transaction, re-inserts the
/// freshly parsed rules tagged the same way, then calls
/// `materializeAll()` so every scope reflects the new contents.
pub struct SourceSync {
    store: Arc<Database>,
    materializer: Arc<Materializer>,
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub ips_ingested: usize,
    pub cidrs_ingested: usize,
    pub dropped: usize,
}

impl SourceSync {
    pub fn new(store: Arc<Database>, materializer: Arc<Materializer>) -> Self {
        Self { store, materializer }
    }

    pub async fn sync_source(&self, source_id: i64, body: &str) -> MaterializeResult<SyncOutcome> {
        let tag = autoguard_store::sources::Sources::source_tag(source_id);
        let parsed = ingest::parse(body);

        // Deactivate-then-reinsert runs as one transaction, per spec: a
        // crash between a committed deactivate and the re-inserts must
        // not be observable as "every rule from this source vanished".
        let mut tx = self.store.pool().begin().await.map_err(autoguard_store::StoreError::from)?;
        self.store
            .blacklist()
            .deactivate_by_source_tag(&mut tx, &tag)
            .await?;

        for entry in &parsed.ips {
            if let ParsedEntry::Ip { address, .. } = entry {
                self.store
                    .blacklist()
                    .add_ip_tx(&mut tx, None, address, &tag, None)
                    .await?;
            }
        }
        for entry in &parsed.cidrs {
            if let ParsedEntry::Cidr { cidr, .. } = entry {
                self.store
                    .blacklist()
                    .add_ip_range_tx(&mut tx, None, cidr, &tag, None)
                    .await?;
            }
        }

        tx.commit().await.map_err(autoguard_store::StoreError::from)?;

        self.materializer.materialize_family(RuleFamily::Ip).await?;
        self.materializer
            .materialize_family(RuleFamily::IpRange)
            .await?;

        info!(
            source_id,
            ips = parsed.ips.len(),
            cidrs = parsed.cidrs.len(),
            dropped = parsed.dropped,
            "external blacklist source synced"
        );

        Ok(SyncOutcome {
            ips_ingested: parsed.ips.len(),
            cidrs_ingested: parsed.cidrs.len(),
            dropped: parsed.dropped,
        })
    }
}
