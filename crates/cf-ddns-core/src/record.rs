//! DNS record model
//!
//! Only host-address records are managed: `A` for IPv4 and `AAAA` for IPv6.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address family of a detected public address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Record type that carries addresses of this family
    pub fn record_type(self) -> RecordType {
        match self {
            IpFamily::V4 => RecordType::A,
            IpFamily::V6 => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name used by the provider API
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Address family this record type needs
    pub fn family(self) -> IpFamily {
        match self {
            RecordType::A => IpFamily::V4,
            RecordType::Aaaa => IpFamily::V6,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS record, either as returned by the provider or as desired locally
///
/// `id` stays empty until the provider assigns one and is not sent when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Build a record that has not been stored at the provider yet
    pub fn desired(
        record_type: RecordType,
        name: impl Into<String>,
        content: impl Into<String>,
        ttl: u32,
        proxied: bool,
    ) -> Self {
        Self {
            id: String::new(),
            record_type,
            name: name.into(),
            content: content.into(),
            ttl,
            proxied,
        }
    }

    /// Whether content, TTL and proxy flag all equal `desired`
    pub fn matches(&self, desired: &DnsRecord) -> bool {
        self.differing_fields(desired).is_empty()
    }

    /// Names of the compared fields that differ from `desired`
    pub fn differing_fields(&self, desired: &DnsRecord) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.content != desired.content {
            fields.push("content");
        }
        if self.ttl != desired.ttl {
            fields.push("ttl");
        }
        if self.proxied != desired.proxied {
            fields.push("proxied");
        }
        fields
    }
}

/// Zone name for a DNS name: its rightmost two labels
///
/// There is no public-suffix awareness, so `host.example.co.uk` maps to
/// `co.uk`. Configure a static zone ID for such names.
pub fn extract_root_domain(domain: &str) -> &str {
    let mut dots = domain.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((idx, _))) => &domain[idx + 1..],
        _ => domain,
    }
}
