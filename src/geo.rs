//! Client network address to coarse geography, via an ip-api-style
//! provider.
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::{
    campaigns::Timestamp,
    fetcher::{FetcherConfig, ResilientFetcher},
    Error, Result,
};

/// Coarse geography derived from a client network address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub country: String,
    pub region: String,
    pub city: String,
    /// Absent when the provider answered without coordinates; weather
    /// enrichment requires both coordinates to be present.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// IANA timezone name. Collected but not applied to dayparting, which
    /// stays UTC-only.
    pub timezone: String,
}

impl GeoInfo {
    /// Latitude/longitude pair, when the provider sent both.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Wire format of the geo provider.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    #[serde(default)]
    country: String,
    #[serde(rename = "regionName", default)]
    region_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    timezone: String,
}

impl GeoResponse {
    fn into_info(self) -> GeoInfo {
        GeoInfo {
            country: self.country,
            region: self.region_name,
            city: self.city,
            latitude: self.lat,
            longitude: self.lon,
            timezone: self.timezone,
        }
    }
}

/// Resolves a client address to [`GeoInfo`] through a [`ResilientFetcher`].
pub struct GeoResolver {
    // Client holds a connection pool internally; the same client is shared
    // with the weather resolver.
    client: reqwest::Client,
    base_url: String,
    fetcher: ResilientFetcher<GeoInfo>,
}

impl GeoResolver {
    /// Service name used for logging and circuit-breaker errors.
    pub const SERVICE: &'static str = "geo";
    /// Cache TTL for geo lookups, in seconds.
    pub const CACHE_TTL_SECS: i64 = 600;

    pub fn new(client: reqwest::Client, base_url: String, timeout: Duration) -> GeoResolver {
        GeoResolver {
            client,
            base_url,
            fetcher: ResilientFetcher::new(
                FetcherConfig::new(
                    GeoResolver::SERVICE,
                    chrono::Duration::seconds(GeoResolver::CACHE_TTL_SECS),
                )
                .with_lookup_timeout(timeout),
            ),
        }
    }

    /// Resolve `ip` to coarse geography. One provider attempt at most;
    /// served from cache when a fresh entry exists.
    pub async fn resolve(&self, ip: &str, now: Timestamp) -> Result<GeoInfo> {
        self.fetcher
            .fetch(ip, now, || self.lookup(ip))
            .await
    }

    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let url = Url::parse(&format!("{}/json/{}", self.base_url, ip))
            .map_err(Error::InvalidBaseUrl)?;

        log::debug!(target: "dco", ip; "fetching geo lookup");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: GeoResponse = response.json().await?;

        if body.status != "success" {
            return Err(Error::MalformedResponse {
                service: GeoResolver::SERVICE,
            });
        }
        Ok(body.into_info())
    }
}
