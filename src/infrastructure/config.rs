use std::env;
use std::time::Duration;

/// Batch-scan tuning for one enrichment pipeline
#[derive(Clone, Debug, PartialEq)]
pub struct ScanSettings {
    pub batch_size: u64,
    /// Peers attempted longer ago than this are selected again
    pub stale_after: Duration,
    /// Sleep between two batches, whatever their size
    pub pause: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub hub_url: Option<String>,
    pub geo_api_url: String,
    pub hub_info_port: u16,
    /// Per-call timeout for the peer list and geolocation requests
    pub http_timeout: Duration,
    pub hub_info_timeout: Duration,
    pub peer_list_interval: Duration,
    pub geo: ScanSettings,
    pub hub_info: ScanSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(default),
            )
        };
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("VERCEL_POSTGRES_URL"))
            .unwrap_or_else(|| "sqlite://peerscope.db?mode=rwc".to_string());

        Self {
            database_url,
            hub_url: lookup("HUB_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|v| normalize_base_url(&v)),
            geo_api_url: normalize_base_url(
                &lookup("GEO_API_URL").unwrap_or_else(|| "http://ip-api.com".to_string()),
            ),
            hub_info_port: lookup("HUB_INFO_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(2281),
            http_timeout: secs("HTTP_TIMEOUT_SECS", 10),
            hub_info_timeout: secs("HUB_INFO_TIMEOUT_SECS", 10),
            peer_list_interval: secs("PEER_LIST_INTERVAL_SECS", 60),
            geo: ScanSettings {
                batch_size: number("GEO_BATCH_SIZE", 10),
                stale_after: secs("GEO_STALE_AFTER_SECS", 24 * 60 * 60),
                pause: secs("GEO_BATCH_PAUSE_SECS", 60),
            },
            hub_info: ScanSettings {
                batch_size: number("HUB_INFO_BATCH_SIZE", 10),
                stale_after: secs("HUB_INFO_STALE_AFTER_SECS", 60 * 60),
                pause: secs("HUB_INFO_BATCH_PAUSE_SECS", 30),
            },
        }
    }
}

/// Hub URLs are often given as bare `host:port`; default those to plain HTTP.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
