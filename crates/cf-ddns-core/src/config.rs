//! Configuration types for the DDNS updater
//!
//! The configuration is read from a TOML file. Secrets may be overridden
//! from the environment so they never have to live in the file.
//!
//! ```toml
//! interval = 300
//!
//! [cloudflare]
//! api_token = "..."
//!
//! [[domains]]
//! name = "home.example.com"
//! record_types = "both"
//! ttl = 300
//! proxied = false
//! ```

use crate::error::{Error, Result};
use crate::record::RecordType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// TTL applied when a domain leaves `ttl` unset or zero
pub const DEFAULT_TTL: u32 = 300;

/// Environment variables that override the `[cloudflare]` table
pub const ENV_API_TOKEN: &str = "CF_DDNS_API_TOKEN";
pub const ENV_API_KEY: &str = "CF_DDNS_API_KEY";
pub const ENV_EMAIL: &str = "CF_DDNS_EMAIL";
pub const ENV_ZONE_ID: &str = "CF_DDNS_ZONE_ID";

/// Main DDNS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Cloudflare API credentials
    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    /// Domains to keep up to date
    #[serde(default)]
    pub domains: Vec<DomainConfig>,

    /// Seconds between runs (0 or negative = run once)
    #[serde(default)]
    pub interval: i64,

    /// Log every decision, not only changes
    #[serde(default)]
    pub verbose: bool,

    /// Append logs to this file instead of stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Compare records but never write them
    #[serde(default)]
    pub dry_run: bool,
}

impl DdnsConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("failed to parse config file: {e}")))
    }

    /// Read and parse a configuration file
    ///
    /// The result is not validated; call [`DdnsConfig::validate`] before use.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Replace credentials with values from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Replace credentials with values from `lookup`, ignoring empty values
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = get(ENV_API_TOKEN) {
            self.cloudflare.api_token = Some(token);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.cloudflare.api_key = Some(key);
        }
        if let Some(email) = get(ENV_EMAIL) {
            self.cloudflare.email = Some(email);
        }
        if let Some(zone_id) = get(ENV_ZONE_ID) {
            self.cloudflare.zone_id = Some(zone_id);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.targets().map(|_| ())
    }

    /// Validate and return the domain targets with defaults applied
    pub fn targets(&self) -> Result<Vec<DomainTarget>> {
        self.cloudflare.credentials()?;

        if self.domains.is_empty() {
            return Err(Error::config("at least one domain must be configured"));
        }

        self.domains
            .iter()
            .enumerate()
            .map(|(i, domain)| {
                domain
                    .to_target()
                    .map_err(|e| match e {
                        Error::ConfigInvalid(msg) => Error::config(format!("domains[{i}]: {msg}")),
                        other => other,
                    })
            })
            .collect()
    }

    /// Whether runs repeat on an interval
    pub fn is_continuous(&self) -> bool {
        self.run_interval().is_some()
    }

    /// Delay between runs, `None` when the updater runs once
    pub fn run_interval(&self) -> Option<Duration> {
        u64::try_from(self.interval)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Cloudflare API settings
///
/// Either `api_token`, or both `api_key` and `email`, must be set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// API token (recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Global API key, used together with `email`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Account email, used together with `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Zone ID (optional, looked up per domain when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

// Keys never show up in Debug output
impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<REDACTED>");
        f.debug_struct("CloudflareConfig")
            .field("api_token", &redact(&self.api_token))
            .field("api_key", &redact(&self.api_key))
            .field("email", &self.email)
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl CloudflareConfig {
    /// Authentication scheme selected by the populated fields
    ///
    /// A token wins over a key/email pair when both are present.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = non_empty(&self.api_token) {
            return Ok(Credentials::Token(token.to_string()));
        }

        match (non_empty(&self.api_key), non_empty(&self.email)) {
            (Some(key), Some(email)) => Ok(Credentials::KeyEmail {
                key: key.to_string(),
                email: email.to_string(),
            }),
            _ => Err(Error::config(
                "either api_token or both api_key and email must be provided",
            )),
        }
    }

    /// Static zone ID, if configured
    pub fn static_zone_id(&self) -> Option<&str> {
        non_empty(&self.zone_id)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Provider authentication
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Token(String),
    /// `X-Auth-Key` + `X-Auth-Email`
    KeyEmail { key: String, email: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<REDACTED>)"),
            Credentials::KeyEmail { email, .. } => f
                .debug_struct("KeyEmail")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

/// A domain to keep up to date, as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// DNS name (e.g., "example.com" or "home.example.com")
    #[serde(default)]
    pub name: String,

    /// "A", "AAAA" or "both" (case-insensitive, default "both")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_types: Option<String>,

    /// Record TTL in seconds (0 = default)
    #[serde(default)]
    pub ttl: u32,

    /// Proxy through Cloudflare
    #[serde(default)]
    pub proxied: bool,
}

impl DomainConfig {
    /// Create a domain configuration with defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_types: None,
            ttl: 0,
            proxied: false,
        }
    }

    /// Set the record type selector
    pub fn with_record_types(mut self, record_types: impl Into<String>) -> Self {
        self.record_types = Some(record_types.into());
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable proxying
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    fn to_target(&self) -> Result<DomainTarget> {
        if self.name.is_empty() {
            return Err(Error::config("name is required"));
        }

        let selector = match self.record_types.as_deref() {
            None | Some("") => RecordSelector::Both,
            Some(raw) => raw.parse()?,
        };

        Ok(DomainTarget {
            name: self.name.clone(),
            selector,
            ttl: if self.ttl == 0 { DEFAULT_TTL } else { self.ttl },
            proxied: self.proxied,
        })
    }
}

/// Which record types a domain manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSelector {
    A,
    Aaaa,
    Both,
}

impl RecordSelector {
    /// Record types in processing order
    pub fn record_types(self) -> &'static [RecordType] {
        match self {
            RecordSelector::A => &[RecordType::A],
            RecordSelector::Aaaa => &[RecordType::Aaaa],
            RecordSelector::Both => &[RecordType::A, RecordType::Aaaa],
        }
    }

    pub fn includes(self, record_type: RecordType) -> bool {
        self.record_types().contains(&record_type)
    }
}

impl FromStr for RecordSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(RecordSelector::A),
            "aaaa" => Ok(RecordSelector::Aaaa),
            "both" => Ok(RecordSelector::Both),
            _ => Err(Error::config("record_types must be 'A', 'AAAA', or 'both'")),
        }
    }
}

/// A validated domain, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTarget {
    pub name: String,
    pub selector: RecordSelector,
    pub ttl: u32,
    pub proxied: bool,
}

impl DomainTarget {
    pub fn wants(&self, record_type: RecordType) -> bool {
        self.selector.includes(record_type)
    }
}
