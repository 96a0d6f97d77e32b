//! Test doubles and common utilities for reconciliation contract tests
//!
//! The mock provider keeps zones and records in memory and records every
//! call, so tests can assert on exactly which API calls a run issued.

#![allow(dead_code)]

use cf_ddns_core::engine::{DdnsEngine, EngineEvent, EngineOptions};
use cf_ddns_core::error::{Error, Result};
use cf_ddns_core::traits::{DnsProvider, IpDetector};
use cf_ddns_core::{DdnsConfig, DnsRecord, DomainConfig, IpFamily, RecordType};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A provider API call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveZone(String),
    List {
        zone_id: String,
        name: String,
        record_type: RecordType,
    },
    Create {
        zone_id: String,
        record: DnsRecord,
    },
    Update {
        zone_id: String,
        record_id: String,
        record: DnsRecord,
    },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Create { .. } | Call::Update { .. })
    }
}

#[derive(Default)]
struct ProviderState {
    zones: HashMap<String, String>,
    records: Vec<(String, DnsRecord)>,
    next_id: usize,
    calls: Vec<Call>,
    failing_lists: HashSet<(String, RecordType)>,
    failing_writes: HashSet<(String, RecordType)>,
}

/// An in-memory DnsProvider that tracks calls
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// Create a new MockDnsProvider that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
        }
    }

    /// Register a zone name → zone ID mapping
    pub fn with_zone(self, name: &str, zone_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .zones
            .insert(name.to_string(), zone_id.to_string());
        self
    }

    /// Store a record and return its ID
    pub fn insert_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let mut record = DnsRecord::desired(record_type, name, content, ttl, proxied);
        record.id = format!("rec-{}", state.next_id);
        let id = record.id.clone();
        state.records.push((zone_id.to_string(), record));
        id
    }

    /// Make list_records fail for a name and type
    pub fn fail_list(&self, name: &str, record_type: RecordType) {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert((name.to_string(), record_type));
    }

    /// Make create/update fail for a name and type
    pub fn fail_writes(&self, name: &str, record_type: RecordType) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert((name.to_string(), record_type));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Stored records for a name and type, in insertion order
    pub fn records(&self, name: &str, record_type: RecordType) -> Vec<DnsRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|(_, r)| r.name == name && r.record_type == record_type)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn resolve_zone(&self, domain: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ResolveZone(domain.to_string()));
        state
            .zones
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::ZoneNotFound(domain.to_string()))
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            record_type,
        });

        if state.failing_lists.contains(&(name.to_string(), record_type)) {
            return Err(Error::provider(10000, "Authentication error"));
        }

        Ok(state
            .records
            .iter()
            .filter(|(z, r)| z == zone_id && r.name == name && r.record_type == record_type)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            zone_id: zone_id.to_string(),
            record: record.clone(),
        });

        if state
            .failing_writes
            .contains(&(record.name.clone(), record.record_type))
        {
            return Err(Error::CreateFailed(Box::new(Error::provider(
                81057,
                "Record already exists.",
            ))));
        }

        state.next_id += 1;
        let mut created = record.clone();
        created.id = format!("rec-{}", state.next_id);
        state.records.push((zone_id.to_string(), created.clone()));
        Ok(created)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            record: record.clone(),
        });

        if state
            .failing_writes
            .contains(&(record.name.clone(), record.record_type))
        {
            return Err(Error::UpdateFailed(Box::new(Error::ProviderFailed)));
        }

        let slot = state
            .records
            .iter_mut()
            .find(|(z, r)| z == zone_id && r.id == record_id)
            .ok_or_else(|| Error::UpdateFailed(Box::new(Error::provider(81044, "Record does not exist."))))?;

        let mut updated = record.clone();
        updated.id = record_id.to_string();
        slot.1 = updated.clone();
        Ok(updated)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IpDetector returning fixed answers per family
pub struct ScriptedDetector {
    ipv4: Option<String>,
    ipv6: Option<String>,
    v4_calls: Arc<AtomicUsize>,
    v6_calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(ipv4: Option<&str>, ipv6: Option<&str>) -> Self {
        Self {
            ipv4: ipv4.map(str::to_string),
            ipv6: ipv6.map(str::to_string),
            v4_calls: Arc::new(AtomicUsize::new(0)),
            v6_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new ScriptedDetector that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ipv4: other.ipv4.clone(),
            ipv6: other.ipv6.clone(),
            v4_calls: Arc::clone(&other.v4_calls),
            v6_calls: Arc::clone(&other.v6_calls),
        }
    }

    pub fn call_count(&self, family: IpFamily) -> usize {
        match family {
            IpFamily::V4 => self.v4_calls.load(Ordering::SeqCst),
            IpFamily::V6 => self.v6_calls.load(Ordering::SeqCst),
        }
    }
}

#[async_trait::async_trait]
impl IpDetector for ScriptedDetector {
    async fn detect(&self, family: IpFamily) -> Result<String> {
        let answer = match family {
            IpFamily::V4 => {
                self.v4_calls.fetch_add(1, Ordering::SeqCst);
                &self.ipv4
            }
            IpFamily::V6 => {
                self.v6_calls.fetch_add(1, Ordering::SeqCst);
                &self.ipv6
            }
        };
        answer.clone().ok_or(Error::Detection { family })
    }
}

/// Helper to create a token-authenticated config for the given domains
pub fn config_with(domains: Vec<DomainConfig>) -> DdnsConfig {
    let mut config = DdnsConfig::new();
    config.cloudflare.api_token = Some("test-token".to_string());
    config.domains = domains;
    config
}

/// Build an engine around shared test doubles
pub fn engine_with(
    detector: &ScriptedDetector,
    provider: &MockDnsProvider,
    options: EngineOptions,
) -> (DdnsEngine, mpsc::Receiver<EngineEvent>) {
    DdnsEngine::new(
        Box::new(ScriptedDetector::sharing_counters_with(detector)),
        Box::new(MockDnsProvider::sharing_state_with(provider)),
        options,
    )
}

/// Collect every event emitted so far
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
