// # DNS Provider Trait
//
// Defines the interface for reading and writing DNS records via the
// provider's zone/record API.
//
// ## Implementations
//
// - Cloudflare API v4: `cf-ddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::{DnsProvider, RecordType};
//
// async fn show(provider: &dyn DnsProvider) -> cf_ddns_core::Result<()> {
//     let zone_id = provider.resolve_zone("example.com").await?;
//     for record in provider.list_records(&zone_id, "home.example.com", RecordType::A).await? {
//         println!("{} -> {}", record.name, record.content);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::{DnsRecord, RecordType};

/// Trait for DNS provider implementations
///
/// Each method maps to exactly one authenticated API call (or none, for a
/// statically configured zone).
///
/// # Thread Safety
///
/// Implementations hold no mutable state beyond their static configuration
/// and may be called from several tasks at once.
///
/// ## Forbidden Capabilities
/// - ❌ Deciding whether an update is needed (owned by `DdnsEngine`)
/// - ❌ Retry or backoff loops
/// - ❌ Caching zones or records across calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the zone ID for a zone name
    ///
    /// Returns a statically configured zone ID without a network call.
    /// Otherwise queries by exact name and takes the first match in provider
    /// order.
    ///
    /// # Errors
    ///
    /// - `Error::ZoneNotFound` if the provider knows no such zone
    async fn resolve_zone(&self, domain: &str) -> Result<String, crate::Error>;

    /// List records matching `name` and `record_type`, in provider order
    ///
    /// An empty list means the record is absent; it is not an error.
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record; the provider assigns its ID
    ///
    /// # Errors
    ///
    /// - `Error::CreateFailed` wrapping the transport or provider error
    async fn create_record(
        &self,
        zone_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord, crate::Error>;

    /// Replace every field of an existing record
    ///
    /// # Errors
    ///
    /// - `Error::UpdateFailed` wrapping the transport or provider error
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
