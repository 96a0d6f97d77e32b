//! Result of a single reconciliation run

use super::DetectedAddresses;
use crate::record::RecordType;

/// What the engine did for a pair that reached the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remote record already matched, no write issued
    Unchanged,
    /// No record existed, one was created
    Created { dry_run: bool },
    /// The first existing record was overwritten
    Updated { previous: String, dry_run: bool },
}

/// Final state of one (domain, record type) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Action),
    /// Not attempted this run (e.g. no address of that family)
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub domain: String,
    pub record_type: RecordType,
    pub outcome: Outcome,
}

/// A domain whose zone could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFailure {
    pub domain: String,
    pub error: String,
}

/// Everything a run decided, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub addresses: DetectedAddresses,
    pub zone_failures: Vec<ZoneFailure>,
    pub pairs: Vec<PairOutcome>,
}

impl RunReport {
    pub(crate) fn new(addresses: DetectedAddresses) -> Self {
        Self {
            addresses,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, domain: &str, record_type: RecordType, outcome: Outcome) {
        self.pairs.push(PairOutcome {
            domain: domain.to_string(),
            record_type,
            outcome,
        });
    }

    pub(crate) fn push_zone_failure(&mut self, domain: &str, error: String) {
        self.zone_failures.push(ZoneFailure {
            domain: domain.to_string(),
            error,
        });
    }

    /// Outcome recorded for a pair, if it was reached
    pub fn outcome(&self, domain: &str, record_type: RecordType) -> Option<&Outcome> {
        self.pairs
            .iter()
            .find(|p| p.domain == domain && p.record_type == record_type)
            .map(|p| &p.outcome)
    }

    /// Creates and updates issued (or simulated) during the run
    pub fn changes(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| {
                matches!(
                    p.outcome,
                    Outcome::Applied(Action::Created { .. } | Action::Updated { .. })
                )
            })
            .count()
    }

    /// Failed pairs plus domains whose zone could not be resolved
    pub fn failures(&self) -> usize {
        self.zone_failures.len()
            + self
                .pairs
                .iter()
                .filter(|p| matches!(p.outcome, Outcome::Failed(_)))
                .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_changes_and_failures() {
        let mut report = RunReport::default();
        report.push("a.example.com", RecordType::A, Outcome::Applied(Action::Unchanged));
        report.push(
            "a.example.com",
            RecordType::Aaaa,
            Outcome::Applied(Action::Created { dry_run: false }),
        );
        report.push("b.example.com", RecordType::A, Outcome::Failed("boom".into()));
        report.push("b.example.com", RecordType::Aaaa, Outcome::Skipped("no IPv6".into()));
        report.push_zone_failure("c.example.org", "zone not found".into());

        assert_eq!(report.changes(), 1);
        assert_eq!(report.failures(), 2);
        assert!(!report.is_clean());
        assert_eq!(
            report.outcome("b.example.com", RecordType::A),
            Some(&Outcome::Failed("boom".into()))
        );
        assert_eq!(report.outcome("c.example.org", RecordType::A), None);
    }
}
