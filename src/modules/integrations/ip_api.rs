//! ip-api.com geolocation lookups
//!
//! The free endpoint is rate limited per client IP. Every response carries
//! `X-Rl` (requests left in the current window) and `X-Ttl` (seconds until
//! the window resets).

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::{DomainError, GeoData};

const FIELDS: &str = "status,message,country,countryCode,region,regionName,city,zip,lat,lon,org,hosting";

/// Used when the service signals a rate limit without a usable `X-Ttl`
const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

const RESERVED_MESSAGES: [&str; 2] = ["reserved range", "private range"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IpApiResponse {
    status: String,
    message: String,
    country: String,
    country_code: String,
    region: String,
    region_name: String,
    city: String,
    zip: String,
    lat: f64,
    lon: f64,
    org: String,
    hosting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoLookup {
    Located(GeoData),
    /// The address belongs to a reserved or private range and will never resolve
    Reserved,
}

impl IpApiResponse {
    fn into_lookup(self, ip_address: &str) -> Result<GeoLookup, DomainError> {
        if RESERVED_MESSAGES.contains(&self.message.as_str()) {
            return Ok(GeoLookup::Reserved);
        }

        if self.status == "fail" {
            return Err(DomainError::NoData(format!(
                "lookup failed for {}: {}",
                ip_address, self.message
            )));
        }

        if self.lat == 0.0 && self.lon == 0.0 {
            return Err(DomainError::NoData(format!(
                "no geo data found for {}",
                ip_address
            )));
        }

        Ok(GeoLookup::Located(GeoData {
            country: self.country,
            country_code: self.country_code,
            region: self.region,
            region_name: self.region_name,
            city: self.city,
            zip: self.zip,
            latitude: self.lat,
            longitude: self.lon,
            hosting: self.hosting,
            org: self.org,
        }))
    }
}

/// How long to back off, if the response says the quota is exhausted
fn rate_limit_backoff(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    };

    let exhausted = header("X-Rl").as_deref() == Some("0");
    if status != StatusCode::TOO_MANY_REQUESTS && !exhausted {
        return None;
    }

    let ttl = header("X-Ttl").and_then(|v| v.parse::<u64>().ok());
    Some(ttl.map(Duration::from_secs).unwrap_or(DEFAULT_BACKOFF))
}

pub struct IpApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl IpApiClient {
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

    /// Resolve an IP address.
    ///
    /// Rate limiting surfaces as `DomainError::RateLimited`; waiting out the
    /// reset window is the caller's job.
    pub async fn lookup(&self, ip_address: &str) -> Result<GeoLookup, DomainError> {
        let url = format!("{}/json/{}?fields={}", self.base_url, ip_address, FIELDS);
        let resp = self.http.get(&url).send().await?;

        if let Some(reset_after) = rate_limit_backoff(resp.status(), resp.headers()) {
            return Err(DomainError::RateLimited { reset_after });
        }

        if !resp.status().is_success() {
            return Err(DomainError::Status {
                status: resp.status().as_u16(),
                context: format!("{}/json/{}", self.base_url, ip_address),
            });
        }

        let body = resp.text().await?;
        let parsed: IpApiResponse = serde_json::from_str(&body)?;

        parsed.into_lookup(ip_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn lookup_from(body: &str) -> Result<GeoLookup, DomainError> {
        serde_json::from_str::<IpApiResponse>(body)
            .unwrap()
            .into_lookup("1.2.3.4")
    }

    #[test]
    fn test_success_maps_all_fields() {
        let result = lookup_from(
            r#"{"status": "success", "country": "Germany", "countryCode": "DE",
                "region": "HE", "regionName": "Hesse", "city": "Frankfurt am Main",
                "zip": "60313", "lat": 50.1109, "lon": 8.6821, "org": "Hetzner",
                "as": "AS24940 Hetzner Online GmbH", "hosting": true, "query": "1.2.3.4"}"#,
        )
        .unwrap();

        let GeoLookup::Located(geo) = result else {
            panic!("expected a located result");
        };
        assert_eq!(geo.country_code, "DE");
        assert_eq!(geo.region_name, "Hesse");
        assert_eq!(geo.latitude, 50.1109);
        assert!(geo.hosting);
        assert_eq!(geo.org, "Hetzner");
    }

    #[test]
    fn test_reserved_and_private_ranges() {
        let reserved =
            lookup_from(r#"{"status": "fail", "message": "reserved range", "query": "0.0.0.1"}"#);
        assert_eq!(reserved.unwrap(), GeoLookup::Reserved);

        let private =
            lookup_from(r#"{"status": "fail", "message": "private range", "query": "10.0.0.1"}"#);
        assert_eq!(private.unwrap(), GeoLookup::Reserved);
    }

    #[test]
    fn test_degenerate_coordinates_are_no_data() {
        let result = lookup_from(r#"{"status": "success", "lat": 0, "lon": 0}"#);
        assert!(matches!(result, Err(DomainError::NoData(_))));

        let result = lookup_from(r#"{"status": "fail", "message": "invalid query"}"#);
        assert!(matches!(result, Err(DomainError::NoData(_))));
    }

    #[test]
    fn test_rate_limit_backoff() {
        let mut headers = HeaderMap::new();
        headers.insert("x-rl", HeaderValue::from_static("44"));
        headers.insert("x-ttl", HeaderValue::from_static("5"));
        assert_eq!(rate_limit_backoff(StatusCode::OK, &headers), None);
        assert_eq!(
            rate_limit_backoff(StatusCode::TOO_MANY_REQUESTS, &headers),
            Some(Duration::from_secs(5))
        );

        headers.insert("x-rl", HeaderValue::from_static("0"));
        assert_eq!(
            rate_limit_backoff(StatusCode::OK, &headers),
            Some(Duration::from_secs(5))
        );

        headers.remove("x-ttl");
        assert_eq!(
            rate_limit_backoff(StatusCode::OK, &headers),
            Some(DEFAULT_BACKOFF)
        );
    }
}
