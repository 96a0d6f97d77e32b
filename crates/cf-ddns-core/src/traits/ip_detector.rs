// # IP Detector Trait
//
// Defines the interface for discovering the host's current public address.
//
// ## Implementations
//
// - HTTPS echo services: `cf-ddns-ip` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::{IpDetector, IpFamily};
//
// async fn print_address(detector: &dyn IpDetector) -> cf_ddns_core::Result<()> {
//     let ipv4 = detector.detect(IpFamily::V4).await?;
//     println!("current IPv4 address: {ipv4}");
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::IpFamily;

/// Trait for public address detection
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - Return a syntactically valid literal of the requested family
/// - Try alternative sources before giving up; no sleeping retries
/// - Every network call is bounded by a timeout
/// - Fail with [`crate::Error::Detection`] when every source is exhausted
///
/// A failure only disables the record types of that family for the current
/// run. The engine decides what to skip.
#[async_trait]
pub trait IpDetector: Send + Sync {
    /// Detect the current public address of `family`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address literal (e.g. `"203.0.113.5"`)
    /// - `Err(Error)`: If no source returned a valid address
    async fn detect(&self, family: IpFamily) -> Result<String, crate::Error>;
}
