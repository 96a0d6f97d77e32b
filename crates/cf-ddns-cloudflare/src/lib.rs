// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 client used by the updater.
//
// ## Behavior
//
// - ✅ One HTTP request per trait call (none for a static zone ID)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Bearer token or X-Auth-Key/X-Auth-Email authentication
// - ✅ Two-stage decode: envelope first, then the call-specific payload
// - ❌ NO retry logic (a failed call fails its record type for this run)
// - ❌ NO caching (zones and records are fetched fresh every run)
// - ❌ NO comparison logic (owned by DdnsEngine)
//
// ## Security Requirements
//
// - API token and key NEVER appear in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cf_ddns_core::config::{CloudflareConfig, Credentials};
use cf_ddns_core::traits::DnsProvider;
use cf_ddns_core::{DnsRecord, Error, RecordType, Result};
use reqwest::RequestBuilder;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Response wrapper shared by every Cloudflare endpoint
///
/// `result` changes shape per endpoint, so it is kept as raw JSON until the
/// caller picks the type.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    result: serde_json::Value,
}

/// One entry of the envelope's `errors` array
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    #[allow(dead_code)]
    name: String,
}

/// Decode a Cloudflare response body into `T`
///
/// Fails when the body is not an envelope. When `success` is false the
/// first reported error is surfaced, or a generic failure if none was
/// reported. Otherwise `result` is decoded as `T`.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| Error::envelope(e.to_string()))?;

    if !envelope.success {
        return Err(match envelope.errors.into_iter().next() {
            Some(first) => Error::provider(first.code, first.message),
            None => Error::ProviderFailed,
        });
    }

    Ok(serde_json::from_value(envelope.result)?)
}

/// Cloudflare DNS provider
///
/// Holds only static configuration, so one instance can serve concurrent
/// callers.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose credentials.
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    credentials: Credentials,

    /// Zone ID (optional, looked up by name when absent)
    zone_id: Option<String>,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token, or global key + email
    /// - `zone_id`: Optional zone ID used for every domain instead of a lookup
    pub fn new(credentials: Credentials, zone_id: Option<String>) -> Result<Self> {
        // Default headers only apply when the request has not set them, so
        // JSON bodies keep a single Content-Type.
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            zone_id: zone_id.filter(|z| !z.is_empty()),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Create a provider from the `[cloudflare]` configuration table
    pub fn from_config(config: &CloudflareConfig) -> Result<Self> {
        Self::new(
            config.credentials()?,
            config.static_zone_id().map(str::to_string),
        )
    }

    /// Send requests to another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach authentication headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::KeyEmail { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }

    /// Execute a request and decode the envelope's `result` as `T`
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::http(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("failed to read response body: {e}")))?;

        // Cloudflare answers errors with an envelope too; only fall back to
        // the status when the body is something else.
        match decode_envelope(&body) {
            Err(Error::Envelope(msg)) if !status.is_success() => {
                Err(Error::http(format!("unexpected status {status}: {msg}")))
            }
            other => other,
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn resolve_zone(&self, domain: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        tracing::debug!("Looking up zone ID for domain: {}", domain);
        let request = self.client.get(self.url("zones")).query(&[("name", domain)]);
        let zones: Vec<Zone> = self.execute(request).await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::ZoneNotFound(domain.to_string()))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com&type=A
    /// ```
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Listing {} records for {}", record_type, name);
        let request = self
            .client
            .get(self.url(&format!("zones/{zone_id}/dns_records")))
            .query(&[("name", name), ("type", record_type.as_str())]);

        self.execute(request).await
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "...", "content": "...", "ttl": 300, "proxied": false}
    /// ```
    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let request = self
            .client
            .post(self.url(&format!("zones/{zone_id}/dns_records")))
            .json(record);

        self.execute(request)
            .await
            .map_err(|e| Error::CreateFailed(Box::new(e)))
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "...", "content": "...", "ttl": 300, "proxied": false}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord> {
        let request = self
            .client
            .put(self.url(&format!("zones/{zone_id}/dns_records/{record_id}")))
            .json(record);

        self.execute(request)
            .await
            .map_err(|e| Error::UpdateFailed(Box::new(e)))
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
