// # HTTP IP Detector
//
// This crate discovers the host's public address by asking external
// IP-echo services over HTTPS.
//
// ## Behavior
//
// Each family has an ordered list of endpoints. They are tried one after
// another; the first response that is HTTP 200 and whose trimmed body is a
// valid literal of the requested family wins, and no further endpoint is
// contacted. Transport errors, other statuses and malformed bodies move on
// to the next endpoint. There is no retry beyond that.

use async_trait::async_trait;
use cf_ddns_core::traits::IpDetector;
use cf_ddns_core::{Error, IpFamily, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// IPv4 echo services, in order of preference
pub const IPV4_SERVICES: &[&str] = &[
    "https://ipv4.icanhazip.com",
    "https://api.ipify.org",
    "https://ipv4.ident.me",
    "https://v4.ident.me",
];

/// IPv6 echo services, in order of preference
pub const IPV6_SERVICES: &[&str] = &[
    "https://ipv6.icanhazip.com",
    "https://api6.ipify.org",
    "https://ipv6.ident.me",
    "https://v6.ident.me",
];

/// Timeout for a single echo request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Public address detection over HTTPS echo services
#[derive(Debug, Clone)]
pub struct HttpIpDetector {
    ipv4_services: Vec<String>,
    ipv6_services: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpDetector {
    /// Create a detector using the built-in service lists
    pub fn new() -> Result<Self> {
        Self::with_services(
            IPV4_SERVICES.iter().map(|s| s.to_string()).collect(),
            IPV6_SERVICES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a detector with custom service lists
    pub fn with_services(ipv4_services: Vec<String>, ipv6_services: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            ipv4_services,
            ipv6_services,
            client,
        })
    }

    fn services(&self, family: IpFamily) -> &[String] {
        match family {
            IpFamily::V4 => &self.ipv4_services,
            IpFamily::V6 => &self.ipv6_services,
        }
    }

    /// Fetch the trimmed body of one echo service
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("request to {url} failed: {e}")))?;

        if response.status() != StatusCode::OK {
            return Err(Error::http(format!("HTTP {} from {}", response.status(), url)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("failed to read response from {url}: {e}")))?;

        Ok(body.trim().to_string())
    }
}

#[async_trait]
impl IpDetector for HttpIpDetector {
    async fn detect(&self, family: IpFamily) -> Result<String> {
        for url in self.services(family) {
            match self.fetch(url).await {
                Ok(ip) if is_valid(family, &ip) => {
                    tracing::debug!("{} address {} from {}", family, ip, url);
                    return Ok(ip);
                }
                Ok(ip) => {
                    tracing::debug!("Ignoring invalid {} address {:?} from {}", family, ip, url);
                }
                Err(e) => {
                    tracing::debug!("{} service {} failed: {}", family, url, e);
                }
            }
        }

        Err(Error::Detection { family })
    }
}

fn is_valid(family: IpFamily, ip: &str) -> bool {
    match family {
        IpFamily::V4 => is_valid_ipv4(ip),
        IpFamily::V6 => is_valid_ipv6(ip),
    }
}

/// Whether `ip` is four dot-separated decimal octets, each 0-255
pub fn is_valid_ipv4(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 3
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().is_ok_and(|n| n <= 255)
    })
}

/// Whether `ip` is 3-8 colon-separated groups of at most 4 hex digits
///
/// This is a shape check only. `::` compression is accepted through empty
/// groups and not checked further.
pub fn is_valid_ipv6(ip: &str) -> bool {
    let groups: Vec<&str> = ip.split(':').collect();
    if !(3..=8).contains(&groups.len()) {
        return false;
    }

    groups
        .iter()
        .all(|group| group.len() <= 4 && group.bytes().all(|b| b.is_ascii_hexdigit()))
}
