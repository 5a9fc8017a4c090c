//! Hub HTTP API: the gossip peer list and each peer's self-reported info

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::domain::{DomainError, Endpoint, HubInfo, PeerKey, PeerSighting};
use crate::utils::time::from_unix_millis;

#[derive(Debug, Default, Deserialize)]
pub struct PeerListResponse {
    #[serde(default)]
    pub contacts: Vec<PeerContact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerContact {
    pub gossip_address: ContactAddress,
    pub rpc_address: ContactAddress,
    pub count: u64,
    pub hub_version: String,
    pub network: String,
    pub app_version: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactAddress {
    pub address: String,
    pub family: i32,
    pub port: i32,
    pub dns_name: String,
}

impl From<ContactAddress> for Endpoint {
    fn from(a: ContactAddress) -> Self {
        Endpoint {
            address: a.address,
            family: a.family,
            port: a.port,
            dns_name: a.dns_name,
        }
    }
}

impl PeerContact {
    /// Returns `None` for contacts without a gossip address, which cannot be keyed.
    pub fn into_sighting(self, seen_at: DateTime<Utc>) -> Option<PeerSighting> {
        let address = self.gossip_address.address.trim().to_string();
        if address.is_empty() {
            return None;
        }

        Some(PeerSighting {
            key: PeerKey::new(self.network, address),
            seen_at,
            gossip: self.gossip_address.into(),
            rpc: self.rpc_address.into(),
            count: i64::try_from(self.count).unwrap_or(i64::MAX),
            hub_version: self.hub_version,
            app_version: self.app_version,
            peer_timestamp: from_unix_millis(self.timestamp),
        })
    }
}

/// Client for the hub's peer list endpoint
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn peer_list_url(&self) -> String {
        format!("{}/v1/currentPeers", self.base_url)
    }

    pub async fn fetch_current_peers(&self) -> Result<Vec<PeerContact>, DomainError> {
        let url = self.peer_list_url();
        let resp = self.http.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(DomainError::Status {
                status: resp.status().as_u16(),
                context: url,
            });
        }

        let body = resp.text().await?;
        let parsed: PeerListResponse = serde_json::from_str(&body)?;

        Ok(parsed.contacts)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubInfoResponse {
    pub version: String,
    pub is_syncing: bool,
    pub nickname: String,
    pub root_hash: String,
    pub db_stats: DbStats,
    pub peer_id: String,
    pub hub_operator_fid: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbStats {
    pub num_messages: i64,
    pub num_fid_events: i64,
    pub num_fname_events: i64,
}

impl HubInfoResponse {
    pub fn into_hub_info(self, latency: Duration) -> HubInfo {
        HubInfo {
            version: self.version,
            is_syncing: self.is_syncing,
            nickname: self.nickname,
            root_hash: self.root_hash,
            num_messages: self.db_stats.num_messages,
            num_fid_events: self.db_stats.num_fid_events,
            num_fname_events: self.db_stats.num_fname_events,
            peer_id: self.peer_id,
            // Zero means the hub does not know its operator
            hub_operator_fid: (self.hub_operator_fid != 0).then_some(self.hub_operator_fid),
            latency_ms: i64::try_from(latency.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

/// Outcome of one info probe. Latency is measured up to the response
/// headers, so it is known even when the body turns out to be unusable.
#[derive(Debug)]
pub struct InfoProbe {
    pub latency: Duration,
    pub result: Result<HubInfo, DomainError>,
}

/// Client for the `/v1/info` endpoint every hub exposes
pub struct HubInfoClient {
    http: reqwest::Client,
    port: u16,
}

impl HubInfoClient {
    pub fn new(port: u16, timeout: Duration) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build client: {}", e)))?;

        Ok(Self { http, port })
    }

    pub async fn probe(&self, rpc_address: &str) -> InfoProbe {
        let url = info_url(rpc_address, self.port);

        let started = Instant::now();
        let sent = self.http.get(&url).send().await;
        let latency = started.elapsed();

        let result = match sent {
            Ok(resp) => read_info(resp, url).await.map(|r| r.into_hub_info(latency)),
            Err(e) => Err(e.into()),
        };

        InfoProbe { latency, result }
    }
}

async fn read_info(resp: reqwest::Response, url: String) -> Result<HubInfoResponse, DomainError> {
    if !resp.status().is_success() {
        return Err(DomainError::Status {
            status: resp.status().as_u16(),
            context: url,
        });
    }

    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

pub fn info_url(rpc_address: &str, port: u16) -> String {
    let host = if rpc_address.contains(':') && !rpc_address.starts_with('[') {
        format!("[{}]", rpc_address)
    } else {
        rpc_address.to_string()
    };
    format!("http://{}:{}/v1/info?dbstats=1", host, port)
}
