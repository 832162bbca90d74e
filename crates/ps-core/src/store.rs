//! Domain Policy Store
//!
//! Keyed collection of per-domain records. Keys are either exact hosts
//! (`example.com`) or wildcard ancestors (`*.example.com`). The store is
//! filled by domain management and read by the resolver.

use std::collections::HashMap;

use crate::domain::get_parent_domain;
use crate::policy::DomainPolicyRecord;

#[derive(Debug, Clone, Default)]
pub struct DomainPolicyStore {
    records: HashMap<String, DomainPolicyRecord>,
}

impl DomainPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store, skipping records without a domain.
    /// A later record with the same key replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = DomainPolicyRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            if record.domain.is_empty() {
                log::warn!("Ignoring domain record without a domain name");
                continue;
            }
            store.insert(record);
        }
        store
    }

    /// Insert or replace the record for `record.domain`.
    pub fn insert(&mut self, record: DomainPolicyRecord) -> Option<DomainPolicyRecord> {
        self.records.insert(record.domain.clone(), record)
    }

    pub fn remove(&mut self, domain: &str) -> Option<DomainPolicyRecord> {
        self.records.remove(domain)
    }

    pub fn get(&self, domain: &str) -> Option<&DomainPolicyRecord> {
        self.records.get(domain)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainPolicyRecord> {
        self.records.values()
    }

    /// Most specific record for `host`.
    ///
    /// An exact key wins. Otherwise `*.` + host is tried, then `*.` + each
    /// parent that still contains a `.`, so `*.example.com` covers
    /// `example.com` itself and a bare `*.com` is never consulted.
    pub fn lookup(&self, host: &str) -> Option<&DomainPolicyRecord> {
        if host.is_empty() {
            return None;
        }

        if let Some(record) = self.records.get(host) {
            return Some(record);
        }

        let mut current = Some(host);
        while let Some(candidate) = current.filter(|h| h.contains('.')) {
            if let Some(record) = self.records.get(&format!("*.{candidate}")) {
                return Some(record);
            }
            current = get_parent_domain(candidate);
        }

        None
    }
}
