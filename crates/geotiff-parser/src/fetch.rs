//! HTTP retrieval of raster bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::{Client, Url};
use tracing::{debug, instrument, warn};

use solar_common::LayerError;

/// Query parameter carrying the access token on raster URLs.
pub const ACCESS_TOKEN_PARAM: &str = "key";

/// Capability to fetch the raw bytes behind a raster URL.
///
/// The URL passed in already carries any access token. Implementations must
/// map transport failures and non-2xx responses to `LayerError::Fetch` and
/// must not retry.
#[async_trait]
pub trait RasterFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, LayerError>;
}

/// Timeouts for raster downloads.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RASTER_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("RASTER_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.connect_timeout = Duration::from_secs(secs);
            }
        }

        config
    }
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RasterFetcher for HttpFetcher {
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    async fn fetch(&self, url: &str) -> Result<Bytes, LayerError> {
        counter!("overlay_fetch_total").increment(1);

        let response = self.client.get(url).send().await.map_err(|e| {
            counter!("overlay_fetch_errors_total", "reason" => "network").increment(1);
            warn!(error = %e, "Raster request failed");
            LayerError::network(e.without_url().to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            counter!("overlay_fetch_errors_total", "reason" => "status").increment(1);
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Raster request returned error status");
            return Err(LayerError::http(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status"),
                body,
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            counter!("overlay_fetch_errors_total", "reason" => "body").increment(1);
            LayerError::network(format!("failed to read response body: {}", e.without_url()))
        })?;

        debug!(bytes = bytes.len(), "Raster downloaded");
        Ok(bytes)
    }
}

/// Append the access token to a raster URL.
///
/// A missing or empty token leaves the URL untouched.
pub fn with_access_token(url: &str, token: Option<&str>) -> Result<String, LayerError> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(url.to_string()),
    };

    let mut parsed = Url::parse(url)
        .map_err(|e| LayerError::network(format!("invalid raster URL: {}", e)))?;
    parsed
        .query_pairs_mut()
        .append_pair(ACCESS_TOKEN_PARAM, token);

    Ok(parsed.to_string())
}

/// Strip the access token from a URL so it can be logged.
pub fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            if kept.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(kept);
            }
            parsed.to_string()
        }
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_appended_to_existing_query() {
        let url = with_access_token("https://solar.example.com/v1/geoTiff:get?id=abc", Some("k123")).unwrap();
        assert_eq!(url, "https://solar.example.com/v1/geoTiff:get?id=abc&key=k123");
    }

    #[test]
    fn test_token_without_query() {
        let url = with_access_token("https://solar.example.com/flux.tif", Some("k123")).unwrap();
        assert_eq!(url, "https://solar.example.com/flux.tif?key=k123");
    }

    #[test]
    fn test_missing_token_keeps_url() {
        let url = with_access_token("https://solar.example.com/flux.tif?id=1", None).unwrap();
        assert_eq!(url, "https://solar.example.com/flux.tif?id=1");
    }

    #[test]
    fn test_invalid_url() {
        let err = with_access_token("not a url", Some("k")).unwrap_err();
        assert!(matches!(err, LayerError::Fetch { status: None, .. }));
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact_url("https://solar.example.com/get?id=abc&key=secret"),
            "https://solar.example.com/get?id=abc"
        );
        assert_eq!(
            redact_url("https://solar.example.com/get?key=secret"),
            "https://solar.example.com/get"
        );
        assert_eq!(redact_url("garbage?key=secret"), "garbage");
    }
}
