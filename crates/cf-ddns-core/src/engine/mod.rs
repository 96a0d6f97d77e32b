//! Core DDNS engine
//!
//! The DdnsEngine is responsible for one reconciliation run:
//! - Detecting the current public addresses (once per run, per needed family)
//! - Resolving each domain's zone via DnsProvider
//! - Comparing existing records with the desired state
//! - Issuing at most one create or update per (domain, record type)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐        ┌──────────────┐        ┌─────────────┐
//! │ IpDetector  │──ip──▶ │  DdnsEngine  │ ◀────▶ │ DnsProvider │
//! └─────────────┘        └──────────────┘        └─────────────┘
//!                                │
//!                                ▼
//!                        ┌──────────────┐
//!                        │ EngineEvent  │
//!                        │ + RunReport  │
//!                        └──────────────┘
//! ```
//!
//! ## Failure scopes
//!
//! 1. Invalid configuration: the run is refused before any network call
//! 2. Detection failure: record types of that family are skipped this run
//! 3. Zone failure: that domain is skipped, other domains proceed
//! 4. List/create/update failure: that pair fails, every other pair proceeds
//!
//! The engine has no notion of "forever". Scheduling repeated runs belongs to
//! the caller.

mod report;
pub mod resolution;

pub use report::{Action, Outcome, PairOutcome, RunReport, ZoneFailure};

use crate::config::{DdnsConfig, DomainTarget};
use crate::error::Result;
use crate::record::{DnsRecord, IpFamily, RecordType, extract_root_domain};
use crate::traits::{DnsProvider, IpDetector};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the DdnsEngine
///
/// Every decision the engine takes is mirrored here, so embedders and tests
/// can observe a run without inspecting log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Run started
    RunStarted { domains: usize },

    /// Public address detected
    AddressDetected { family: IpFamily, address: String },

    /// No echo service returned an address of this family
    DetectionFailed { family: IpFamily, error: String },

    /// Zone ID resolved for a domain
    ZoneResolved { domain: String, zone_id: String },

    /// Zone resolution failed, the domain is skipped
    ZoneFailed { domain: String, error: String },

    /// Remote record already matches
    RecordUpToDate {
        domain: String,
        record_type: RecordType,
        content: String,
    },

    /// Record created (or would be, in dry-run mode)
    RecordCreated {
        domain: String,
        record_type: RecordType,
        content: String,
        dry_run: bool,
    },

    /// Record updated (or would be, in dry-run mode)
    RecordUpdated {
        domain: String,
        record_type: RecordType,
        previous: String,
        content: String,
        dry_run: bool,
    },

    /// Pair not processed this run
    PairSkipped {
        domain: String,
        record_type: RecordType,
        reason: String,
    },

    /// Pair failed
    PairFailed {
        domain: String,
        record_type: RecordType,
        error: String,
    },

    /// Run finished
    RunFinished { changes: usize, failures: usize },
}

/// Engine settings that are fixed for the engine's lifetime
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Look up each name through the system resolver and log the answer
    pub verbose: bool,

    /// Log intended writes instead of issuing them
    pub dry_run: bool,

    /// Capacity of the event channel; events beyond it are dropped
    pub event_channel_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineOptions {
    /// Options taken from a configuration file
    pub fn from_config(config: &DdnsConfig) -> Self {
        Self {
            verbose: config.verbose,
            dry_run: config.dry_run,
            ..Self::default()
        }
    }
}

/// Addresses detected at the start of a run, shared by every domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedAddresses {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl DetectedAddresses {
    pub fn get(&self, family: IpFamily) -> Option<&str> {
        match family {
            IpFamily::V4 => self.ipv4.as_deref(),
            IpFamily::V6 => self.ipv6.as_deref(),
        }
    }

    fn set(&mut self, family: IpFamily, address: String) {
        match family {
            IpFamily::V4 => self.ipv4 = Some(address),
            IpFamily::V6 => self.ipv6 = Some(address),
        }
    }
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Call [`DdnsEngine::run_once()`] for every scheduled run
///
/// ## Threading
///
/// A run processes domains and record types strictly one after another. The
/// engine itself holds no mutable state, so dropping a run future midway
/// abandons that run without affecting the next one.
pub struct DdnsEngine {
    /// Public address detection
    detector: Box<dyn IpDetector>,

    /// DNS provider for reading and writing records
    provider: Box<dyn DnsProvider>,

    options: EngineOptions,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        detector: Box<dyn IpDetector>,
        provider: Box<dyn DnsProvider>,
        options: EngineOptions,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(options.event_channel_capacity.max(1));

        let engine = Self {
            detector,
            provider,
            options,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Perform one reconciliation run
    ///
    /// The configuration is validated first; an invalid configuration is the
    /// only error returned. Every other failure is logged, emitted as an event
    /// and recorded in the returned report.
    pub async fn run_once(&self, config: &DdnsConfig) -> Result<RunReport> {
        let targets = config.targets()?;

        self.emit_event(EngineEvent::RunStarted {
            domains: targets.len(),
        });
        debug!("Starting DNS update run for {} domain(s)", targets.len());

        let addresses = self.detect_addresses(&targets).await;
        let mut report = RunReport::new(addresses.clone());

        for target in &targets {
            debug!("Processing domain: {}", target.name);
            self.reconcile_domain(target, &addresses, &mut report).await;
        }

        let changes = report.changes();
        let failures = report.failures();
        if failures == 0 {
            info!("DNS update run completed: {} change(s)", changes);
        } else {
            warn!(
                "DNS update run completed: {} change(s), {} failure(s)",
                changes, failures
            );
        }
        self.emit_event(EngineEvent::RunFinished { changes, failures });

        Ok(report)
    }

    /// Detect the address of every family some target needs
    async fn detect_addresses(&self, targets: &[DomainTarget]) -> DetectedAddresses {
        let mut addresses = DetectedAddresses::default();

        for family in [IpFamily::V4, IpFamily::V6] {
            let record_type = family.record_type();
            if !targets.iter().any(|t| t.wants(record_type)) {
                continue;
            }

            match self.detector.detect(family).await {
                Ok(address) => {
                    debug!("Current {} address: {}", family, address);
                    self.emit_event(EngineEvent::AddressDetected {
                        family,
                        address: address.clone(),
                    });
                    addresses.set(family, address);
                }
                Err(e) => {
                    warn!("Failed to get {} address: {}", family, e);
                    self.emit_event(EngineEvent::DetectionFailed {
                        family,
                        error: e.to_string(),
                    });
                }
            }
        }

        addresses
    }

    /// Reconcile every selected record type of one domain
    async fn reconcile_domain(
        &self,
        target: &DomainTarget,
        addresses: &DetectedAddresses,
        report: &mut RunReport,
    ) {
        let mut pending = Vec::new();
        for &record_type in target.selector.record_types() {
            match addresses.get(record_type.family()) {
                Some(address) => pending.push((record_type, address)),
                None => {
                    let reason = format!("no {} address detected", record_type.family());
                    debug!(
                        "Skipping {} record for {}: {}",
                        record_type, target.name, reason
                    );
                    self.emit_event(EngineEvent::PairSkipped {
                        domain: target.name.clone(),
                        record_type,
                        reason: reason.clone(),
                    });
                    report.push(&target.name, record_type, Outcome::Skipped(reason));
                }
            }
        }

        if pending.is_empty() {
            return;
        }

        let root = extract_root_domain(&target.name);
        debug!("Getting zone ID for domain: {}", root);
        let zone_id = match self.provider.resolve_zone(root).await {
            Ok(zone_id) => {
                debug!("Zone ID found: {}", zone_id);
                self.emit_event(EngineEvent::ZoneResolved {
                    domain: target.name.clone(),
                    zone_id: zone_id.clone(),
                });
                zone_id
            }
            Err(e) => {
                error!("Failed to update domain {}: failed to get zone ID: {}", target.name, e);
                self.emit_event(EngineEvent::ZoneFailed {
                    domain: target.name.clone(),
                    error: e.to_string(),
                });
                report.push_zone_failure(&target.name, e.to_string());
                return;
            }
        };

        for (record_type, address) in pending {
            let outcome = match self.reconcile(&zone_id, target, record_type, address).await {
                Ok(action) => Outcome::Applied(action),
                Err(e) => {
                    error!(
                        "Failed to update {} record for {}: {}",
                        record_type, target.name, e
                    );
                    self.emit_event(EngineEvent::PairFailed {
                        domain: target.name.clone(),
                        record_type,
                        error: e.to_string(),
                    });
                    Outcome::Failed(e.to_string())
                }
            };
            report.push(&target.name, record_type, outcome);
        }
    }

    /// Bring one (domain, record type) pair to the desired state
    ///
    /// Only the first record the provider returns is inspected. Content, TTL
    /// and proxy flag must all match for the record to count as up to date;
    /// otherwise the full desired record is written in one call.
    pub async fn reconcile(
        &self,
        zone_id: &str,
        target: &DomainTarget,
        record_type: RecordType,
        address: &str,
    ) -> Result<Action> {
        debug!(
            "Checking {} record for {} (target IP: {})",
            record_type, target.name, address
        );

        if self.options.verbose {
            resolution::log_current_resolution(&target.name, record_type).await;
        }

        let existing = self
            .provider
            .list_records(zone_id, &target.name, record_type)
            .await?;
        debug!(
            "Found {} existing {} record(s) for {}",
            existing.len(),
            record_type,
            target.name
        );
        if existing.len() > 1 {
            warn!(
                "{} {} records exist for {}; only {} is managed",
                existing.len(),
                record_type,
                target.name,
                existing[0].id
            );
        }

        let desired = DnsRecord::desired(
            record_type,
            target.name.as_str(),
            address,
            target.ttl,
            target.proxied,
        );

        match existing.into_iter().next() {
            None => self.create(zone_id, desired).await,
            Some(current) => {
                debug!(
                    "Current {} record for {}: IP={}, TTL={}, Proxied={}",
                    record_type, target.name, current.content, current.ttl, current.proxied
                );

                let drift = current.differing_fields(&desired);
                if drift.is_empty() {
                    debug!(
                        "{} record for {} is already up to date - no API call needed",
                        record_type, target.name
                    );
                    self.emit_event(EngineEvent::RecordUpToDate {
                        domain: target.name.clone(),
                        record_type,
                        content: current.content,
                    });
                    return Ok(Action::Unchanged);
                }

                debug!(
                    "{} record for {} differs in {}: IP {} -> {}, TTL {} -> {}, Proxied {} -> {}",
                    record_type,
                    target.name,
                    drift.join(", "),
                    current.content,
                    desired.content,
                    current.ttl,
                    desired.ttl,
                    current.proxied,
                    desired.proxied
                );
                self.update(zone_id, current, desired).await
            }
        }
    }

    async fn create(&self, zone_id: &str, desired: DnsRecord) -> Result<Action> {
        let dry_run = self.options.dry_run;

        if dry_run {
            info!(
                "[DRY-RUN] Would create {} record for {} with payload: {}",
                desired.record_type,
                desired.name,
                serde_json::to_string(&desired)?
            );
        } else {
            info!(
                "Creating {} record for {} with IP {}",
                desired.record_type, desired.name, desired.content
            );
            let created = self.provider.create_record(zone_id, &desired).await?;
            info!(
                "Successfully created {} record for {} (id: {})",
                desired.record_type, desired.name, created.id
            );
        }

        self.emit_event(EngineEvent::RecordCreated {
            domain: desired.name,
            record_type: desired.record_type,
            content: desired.content,
            dry_run,
        });
        Ok(Action::Created { dry_run })
    }

    async fn update(&self, zone_id: &str, current: DnsRecord, desired: DnsRecord) -> Result<Action> {
        let dry_run = self.options.dry_run;

        if dry_run {
            info!(
                "[DRY-RUN] Would update {} record {} for {} with payload: {}",
                desired.record_type,
                current.id,
                desired.name,
                serde_json::to_string(&desired)?
            );
        } else {
            info!(
                "Updating {} record for {}: {} to {}",
                desired.record_type, desired.name, current.content, desired.content
            );
            self.provider
                .update_record(zone_id, &current.id, &desired)
                .await?;
            info!(
                "Successfully updated {} record for {}",
                desired.record_type, desired.name
            );
        }

        self.emit_event(EngineEvent::RecordUpdated {
            domain: desired.name,
            record_type: desired.record_type,
            previous: current.content.clone(),
            content: desired.content,
            dry_run,
        });
        Ok(Action::Updated {
            previous: current.content,
            dry_run,
        })
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_addresses_by_family() {
        let mut addresses = DetectedAddresses::default();
        assert_eq!(addresses.get(IpFamily::V4), None);

        addresses.set(IpFamily::V6, "2001:db8::1".to_string());
        assert_eq!(addresses.get(IpFamily::V6), Some("2001:db8::1"));
        assert_eq!(addresses.get(IpFamily::V4), None);
    }

    #[test]
    fn options_follow_config() {
        let mut config = DdnsConfig::new();
        config.verbose = true;
        config.dry_run = true;

        let options = EngineOptions::from_config(&config);
        assert!(options.verbose);
        assert!(options.dry_run);
        assert_eq!(options.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }
}
