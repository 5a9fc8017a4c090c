//! Peer List Ingestor - mirrors the hub's gossip contact list into the store

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::domain::{DomainError, PeerRepository};
use crate::modules::integrations::hub::HubClient;

/// Outcome of one ingestion cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub received: usize,
    pub upserted: usize,
    /// Contacts that could not be keyed
    pub skipped: usize,
    pub failed: usize,
}

pub struct PeerListIngestor {
    peers: Arc<dyn PeerRepository>,
    client: HubClient,
    interval: Duration,
}

impl PeerListIngestor {
    pub fn new(peers: Arc<dyn PeerRepository>, client: HubClient, interval: Duration) -> Self {
        Self {
            peers,
            client,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Fetch immediately, then once per interval, forever.
    pub async fn run(self) {
        tracing::info!(
            "📡 Peer list ingestor started (source: {}, every {}s)",
            self.client.peer_list_url(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick completes immediately and seeds the store
            ticker.tick().await;

            match self.ingest_once().await {
                Ok(summary) => tracing::info!(
                    "Peer list ingested: {} contacts, {} upserted, {} skipped, {} failed",
                    summary.received,
                    summary.upserted,
                    summary.skipped,
                    summary.failed
                ),
                Err(e) => tracing::warn!("⚠️ Skipping peer list cycle: {}", e),
            }
        }
    }

    /// Run a single fetch/decode/upsert cycle.
    ///
    /// Fetch and decode failures abort the cycle before anything is written.
    /// Upsert failures are per contact and never stop the rest of the list.
    pub async fn ingest_once(&self) -> Result<IngestSummary, DomainError> {
        tracing::debug!("Fetching peer list from {}", self.client.peer_list_url());
        let contacts = self.client.fetch_current_peers().await?;

        let seen_at = Utc::now();
        let mut summary = IngestSummary {
            received: contacts.len(),
            ..Default::default()
        };

        for contact in contacts {
            let Some(sighting) = contact.into_sighting(seen_at) else {
                tracing::debug!("Ignoring contact without gossip address");
                summary.skipped += 1;
                continue;
            };

            match self.peers.upsert_peer(&sighting).await {
                Ok(()) => summary.upserted += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(peer = %sighting.key, "❌ Failed to upsert peer: {}", e);
                }
            }
        }

        Ok(summary)
    }
}
