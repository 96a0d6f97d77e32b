// # cf-ddns-core
//
// Core library for the Cloudflare dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the reconciliation logic for dynamic DNS updates:
// - **IpDetector**: Trait for discovering the current public address per family
// - **DnsProvider**: Trait for the provider's zone/record API
// - **DdnsEngine**: Runs the detect → fetch → compare → create/update cycle
// - **DdnsConfig**: TOML configuration and its validation
//
// ## Design Principles
//
// 1. **Idempotence**: A record that already matches is never written
// 2. **Failure isolation**: One domain or record type failing never stops the others
// 3. **No local state**: The provider is the only source of truth between runs
// 4. **Library-First**: Scheduling, CLI and log setup live in the `cf-ddns` binary

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod record;

// Re-export core types for convenience
pub use traits::{IpDetector, DnsProvider};
pub use engine::{DdnsEngine, EngineEvent, EngineOptions, DetectedAddresses, RunReport, Outcome, Action};
pub use config::{DdnsConfig, CloudflareConfig, Credentials, DomainConfig, DomainTarget, RecordSelector};
pub use error::{Error, Result};
pub use record::{DnsRecord, IpFamily, RecordType, extract_root_domain};
