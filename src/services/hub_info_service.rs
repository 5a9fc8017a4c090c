//! Hub Info Prober - asks every peer for its version and sync state

use chrono::Utc;
use std::sync::Arc;

use super::{BatchSummary, stale_cutoff};
use crate::domain::{DomainError, Enrichment, Peer, PeerPatch, PeerRepository};
use crate::infrastructure::config::ScanSettings;
use crate::modules::integrations::hub::HubInfoClient;

pub struct HubInfoProber {
    peers: Arc<dyn PeerRepository>,
    client: HubInfoClient,
    settings: ScanSettings,
}

impl HubInfoProber {
    pub fn new(
        peers: Arc<dyn PeerRepository>,
        client: HubInfoClient,
        settings: ScanSettings,
    ) -> Self {
        Self {
            peers,
            client,
            settings,
        }
    }

    pub async fn run(self) {
        tracing::info!("🩺 Hub info prober started");

        loop {
            match self.process_batch().await {
                Ok(summary) if summary.selected > 0 => tracing::info!(
                    "Hub info batch done: {} selected, {} probed, {} failed",
                    summary.selected,
                    summary.updated,
                    summary.failed
                ),
                Ok(_) => tracing::debug!("No peers need a hub info probe"),
                Err(e) => tracing::error!("❌ Hub info batch failed: {}", e),
            }

            tokio::time::sleep(self.settings.pause).await;
        }
    }

    /// Probe one batch of stale peers, serially.
    pub async fn process_batch(&self) -> Result<BatchSummary, DomainError> {
        let cutoff = stale_cutoff(Utc::now(), self.settings.stale_after);
        let peers = self
            .peers
            .find_stale(Enrichment::Info, cutoff, self.settings.batch_size)
            .await?;

        let mut summary = BatchSummary {
            selected: peers.len(),
            ..Default::default()
        };

        for peer in &peers {
            match self.probe_peer(peer).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(peer = %peer.key, "❌ Failed to save hub info: {}", e);
                }
            }
        }

        Ok(summary)
    }

    /// Probe one peer and record the attempt. Returns whether the probe
    /// produced fresh operational data.
    async fn probe_peer(&self, peer: &Peer) -> Result<bool, DomainError> {
        let rpc_address = peer
            .rpc
            .as_ref()
            .map(|rpc| rpc.address.trim())
            .filter(|address| !address.is_empty());

        let info = match rpc_address {
            Some(address) => {
                let probe = self.client.probe(address).await;
                match probe.result {
                    Ok(info) => {
                        tracing::debug!(
                            peer = %peer.key,
                            "Hub {} answered in {}ms",
                            info.version,
                            info.latency_ms
                        );
                        Some(info)
                    }
                    Err(e) => {
                        tracing::warn!(
                            peer = %peer.key,
                            latency_ms = u64::try_from(probe.latency.as_millis()).unwrap_or(u64::MAX),
                            "Hub info probe failed: {}",
                            e
                        );
                        None
                    }
                }
            }
            None => {
                tracing::warn!(peer = %peer.key, "No RPC address to probe");
                None
            }
        };

        let probed = info.is_some();
        // The attempt is stamped either way so the next scan skips this peer
        self.peers
            .update_fields(&peer.key, PeerPatch::info(Utc::now(), info))
            .await?;

        Ok(probed)
    }
}
