//! Core traits for the DDNS updater
//!
//! This module defines the seams between the reconciler and the outside world.
//!
//! - [`IpDetector`]: Discover the host's public address per family
//! - [`DnsProvider`]: Read and write records through the provider API

pub mod ip_detector;
pub mod dns_provider;

pub use ip_detector::IpDetector;
pub use dns_provider::DnsProvider;
