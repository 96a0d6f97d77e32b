//! Diagnostic lookup of what a name currently resolves to
//!
//! Used in verbose mode only. Lookups go through the system resolver and
//! never affect the outcome of a run.

use crate::record::{IpFamily, RecordType};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for a diagnostic lookup
pub const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Log the public resolution of `name` for `record_type`
pub async fn log_current_resolution(name: &str, record_type: RecordType) {
    debug!(
        "Performing DNS lookup to check current resolution for {} ({} record)...",
        name, record_type
    );

    let lookup = tokio::net::lookup_host((name, 0));
    let addrs = match tokio::time::timeout(DNS_LOOKUP_TIMEOUT, lookup).await {
        Ok(Ok(addrs)) => addrs,
        Ok(Err(e)) => {
            warn!("DNS lookup failed for {} ({} record): {}", name, record_type, e);
            return;
        }
        Err(_) => {
            warn!(
                "DNS lookup for {} ({} record) timed out after {:?}",
                name, record_type, DNS_LOOKUP_TIMEOUT
            );
            return;
        }
    };

    let matching = addresses_of_family(addrs, record_type.family());
    if matching.is_empty() {
        info!("No {} records found in DNS for {}", record_type, name);
    } else {
        info!(
            "Current DNS resolution for {} ({}): {}",
            name,
            record_type,
            matching.join(", ")
        );
    }
}

fn addresses_of_family(addrs: impl IntoIterator<Item = SocketAddr>, family: IpFamily) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ip in addrs.into_iter().map(|a| a.ip()) {
        let wanted = match (family, ip) {
            (IpFamily::V4, IpAddr::V4(_)) => true,
            (IpFamily::V6, IpAddr::V6(v6)) => v6.to_ipv4_mapped().is_none(),
            _ => false,
        };
        let text = ip.to_string();
        if wanted && !out.contains(&text) {
            out.push(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_family_and_dedups() {
        let addrs: Vec<SocketAddr> = vec![
            "203.0.113.5:0".parse().unwrap(),
            "[2001:db8::1]:0".parse().unwrap(),
            "203.0.113.5:0".parse().unwrap(),
            "[::ffff:198.51.100.1]:0".parse().unwrap(),
        ];

        assert_eq!(
            addresses_of_family(addrs.clone(), IpFamily::V4),
            vec!["203.0.113.5".to_string()]
        );
        assert_eq!(
            addresses_of_family(addrs, IpFamily::V6),
            vec!["2001:db8::1".to_string()]
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_not_propagated() {
        // `.invalid` never resolves
        log_current_resolution("cf-ddns.invalid", RecordType::A).await;
    }
}
