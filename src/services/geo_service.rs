//! Geo Resolver - fills in geolocation data for peers that lack it

use chrono::Utc;
use std::sync::Arc;

use super::{BatchSummary, stale_cutoff};
use crate::domain::{DomainError, Enrichment, Peer, PeerPatch, PeerRepository};
use crate::infrastructure::config::ScanSettings;
use crate::modules::integrations::ip_api::{GeoLookup, IpApiClient};

pub struct GeoResolver {
    peers: Arc<dyn PeerRepository>,
    client: IpApiClient,
    settings: ScanSettings,
}

impl GeoResolver {
    pub fn new(peers: Arc<dyn PeerRepository>, client: IpApiClient, settings: ScanSettings) -> Self {
        Self {
            peers,
            client,
            settings,
        }
    }

    pub async fn run(self) {
        tracing::info!("🌍 Geo resolver started");

        loop {
            match self.process_batch().await {
                Ok(summary) if summary.selected > 0 => tracing::info!(
                    "Geo batch done: {} selected, {} resolved, {} failed",
                    summary.selected,
                    summary.updated,
                    summary.failed
                ),
                Ok(_) => tracing::debug!("No peers need geo resolution"),
                Err(e) => tracing::error!("❌ Geo batch failed: {}", e),
            }

            // Fixed pause between batches, even when the batch was empty
            tokio::time::sleep(self.settings.pause).await;
        }
    }

    /// Resolve one batch of stale peers, serially.
    pub async fn process_batch(&self) -> Result<BatchSummary, DomainError> {
        let cutoff = stale_cutoff(Utc::now(), self.settings.stale_after);
        let peers = self
            .peers
            .find_stale(Enrichment::Geo, cutoff, self.settings.batch_size)
            .await?;

        let mut summary = BatchSummary {
            selected: peers.len(),
            ..Default::default()
        };

        for peer in &peers {
            match self.resolve_peer(peer).await {
                Ok(()) => summary.updated += 1,
                Err(DomainError::RateLimited { reset_after }) => {
                    summary.failed += 1;
                    tracing::warn!(
                        peer = %peer.key,
                        "⏳ Geolocation rate limit reached, pausing {}s",
                        reset_after.as_secs()
                    );
                    // Stalls the rest of the batch until the quota resets
                    tokio::time::sleep(reset_after).await;
                }
                Err(e @ DomainError::Database(_)) => {
                    summary.failed += 1;
                    tracing::error!(peer = %peer.key, "❌ Failed to save geo data: {}", e);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(peer = %peer.key, "Geo lookup failed: {}", e);
                    // Still due, but moves behind peers not tried yet
                    if let Err(e) = self
                        .peers
                        .update_fields(&peer.key, PeerPatch::geo_attempt(Utc::now()))
                        .await
                    {
                        tracing::error!(peer = %peer.key, "❌ Failed to record geo attempt: {}", e);
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Look up one peer and store the result.
    ///
    /// Errors leave the geo group untouched so the next scan picks it up again.
    async fn resolve_peer(&self, peer: &Peer) -> Result<(), DomainError> {
        let data = match self.client.lookup(&peer.key.address).await? {
            GeoLookup::Located(geo) => Some(geo),
            GeoLookup::Reserved => {
                tracing::debug!(peer = %peer.key, "Address is in a reserved range");
                None
            }
        };

        self.peers
            .update_fields(&peer.key, PeerPatch::geo(Utc::now(), data))
            .await
    }
}
