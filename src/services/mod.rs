//! Services Layer
//!
//! The three enrichment pipelines. Each one owns its HTTP client and a handle
//! on the peer repository, and runs as an independent background task.

pub mod geo_service;
pub mod hub_info_service;
pub mod peer_list_service;

use chrono::{DateTime, Utc};
use std::time::Duration;

pub use geo_service::GeoResolver;
pub use hub_info_service::HubInfoProber;
pub use peer_list_service::{IngestSummary, PeerListIngestor};

/// What one pass over a batch of stale peers achieved
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub selected: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Rows last attempted before the returned instant are stale
pub(crate) fn stale_cutoff(now: DateTime<Utc>, stale_after: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(stale_after)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
