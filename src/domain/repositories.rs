//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::DomainError;

/// Composite identity of a peer row: (network, gossip address)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub network: String,
    pub address: String,
}

impl PeerKey {
    pub fn new(network: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
        }
    }
}

impl std::fmt::Display for PeerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.address)
    }
}

/// Gossip or RPC endpoint as advertised by the hub
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Endpoint {
    pub address: String,
    pub family: i32,
    pub port: i32,
    pub dns_name: String,
}

/// Everything the peer list ingestor learns about a peer in one sighting
#[derive(Debug, Clone, PartialEq)]
pub struct PeerSighting {
    pub key: PeerKey,
    pub seen_at: DateTime<Utc>,
    pub gossip: Endpoint,
    pub rpc: Endpoint,
    pub count: i64,
    pub hub_version: String,
    pub app_version: String,
    pub peer_timestamp: Option<DateTime<Utc>>,
}

/// Geolocation field group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoData {
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub region_name: String,
    pub city: String,
    pub zip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub hosting: bool,
    pub org: String,
}

/// Operational field group reported by the peer itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubInfo {
    pub version: String,
    pub is_syncing: bool,
    pub nickname: String,
    pub root_hash: String,
    pub num_messages: i64,
    pub num_fid_events: i64,
    pub num_fname_events: i64,
    pub peer_id: String,
    /// `None` means "unknown": the stored value is left untouched
    pub hub_operator_fid: Option<i64>,
    pub latency_ms: i64,
}

/// A stored peer row
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub key: PeerKey,
    pub last_seen: DateTime<Utc>,
    pub gossip: Option<Endpoint>,
    pub rpc: Option<Endpoint>,
    pub count: Option<i64>,
    pub hub_version: Option<String>,
    pub app_version: Option<String>,
    pub peer_timestamp: Option<DateTime<Utc>>,
    pub geo: Option<GeoData>,
    pub geo_fetched_at: Option<DateTime<Utc>>,
    /// Last geolocation attempt, successful or not
    pub geo_attempted_at: Option<DateTime<Utc>>,
    pub info: Option<HubInfo>,
    pub info_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a geolocation attempt. `data: None` records the attempt only.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoStamp {
    pub fetched_at: DateTime<Utc>,
    pub data: Option<GeoData>,
}

/// Result of a hub info probe. `info: None` records the attempt only.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoStamp {
    pub fetched_at: DateTime<Utc>,
    pub info: Option<HubInfo>,
}

/// Partial update of a peer row, one optional entry per field group.
/// Groups left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerPatch {
    pub geo: Option<GeoStamp>,
    pub info: Option<InfoStamp>,
    /// Records a failed geolocation attempt without marking the peer fresh
    pub geo_attempt: Option<DateTime<Utc>>,
}

impl PeerPatch {
    pub fn geo(fetched_at: DateTime<Utc>, data: Option<GeoData>) -> Self {
        Self {
            geo: Some(GeoStamp { fetched_at, data }),
            ..Default::default()
        }
    }

    pub fn info(fetched_at: DateTime<Utc>, info: Option<HubInfo>) -> Self {
        Self {
            info: Some(InfoStamp { fetched_at, info }),
            ..Default::default()
        }
    }

    pub fn geo_attempt(attempted_at: DateTime<Utc>) -> Self {
        Self {
            geo_attempt: Some(attempted_at),
            ..Default::default()
        }
    }
}

/// Which enrichment timestamp a staleness scan looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    Geo,
    Info,
}

/// Repository trait for peer rows
#[async_trait]
pub trait PeerRepository: Send + Sync {
    /// Insert a new peer or refresh the ingestion fields of an existing one
    async fn upsert_peer(&self, sighting: &PeerSighting) -> Result<(), DomainError>;

    /// Find up to `limit` peers whose enrichment was never stamped or was
    /// stamped before `cutoff`, least recently attempted first
    async fn find_stale(
        &self,
        enrichment: Enrichment,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Peer>, DomainError>;

    /// Apply a partial update to a single peer
    async fn update_fields(&self, key: &PeerKey, patch: PeerPatch) -> Result<(), DomainError>;

    /// Find a single peer by key
    async fn find_by_key(&self, key: &PeerKey) -> Result<Option<Peer>, DomainError>;
}
