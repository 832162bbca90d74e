//! Domain Policy Resolver
//!
//! Turns a document host into an [`EffectivePolicy`]. Deferred fields are
//! read from the global defaults at resolution time, so a change to the
//! defaults reaches every domain that did not override that field.

use crate::policy::{EffectivePolicy, GlobalDefaults};
use crate::store::DomainPolicyStore;

/// Resolve the policy for `host`. An empty host gets the defaults.
pub fn resolve(host: &str, store: &DomainPolicyStore, defaults: &GlobalDefaults) -> EffectivePolicy {
    let mut policy = match store.lookup(host) {
        Some(record) => {
            log::debug!("Applying domain settings {} to {}", record.domain, host);
            EffectivePolicy::from_record(record, defaults)
        }
        None => EffectivePolicy::from_defaults(defaults),
    };
    policy.host = (!host.is_empty()).then(|| host.to_string());
    policy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DomainPolicyRecord, Tristate};
    use crate::types::ListId;

    fn js_store(key: &str, javascript: Tristate) -> DomainPolicyStore {
        let mut record = DomainPolicyRecord::new(key);
        record.javascript = javascript;
        DomainPolicyStore::from_records([record])
    }

    #[test]
    fn test_wildcard_record_overrides_default() {
        let defaults = GlobalDefaults { javascript: false, ..GlobalDefaults::default() };
        let store = js_store("*.example.com", Tristate::Enabled);

        let sub = resolve("sub.example.com", &store, &defaults);
        assert!(sub.javascript);
        assert_eq!(sub.source.as_deref(), Some("*.example.com"));
        assert_eq!(sub.host.as_deref(), Some("sub.example.com"));

        let other = resolve("other.com", &store, &defaults);
        assert!(!other.javascript);
        assert!(other.source.is_none());
    }

    #[test]
    fn test_exact_record_takes_precedence() {
        let mut exact = DomainPolicyRecord::new("example.com");
        exact.javascript = Tristate::Disabled;
        let mut wildcard = DomainPolicyRecord::new("*.example.com");
        wildcard.javascript = Tristate::Enabled;
        let store = DomainPolicyStore::from_records([wildcard, exact]);
        let defaults = GlobalDefaults::default();

        let policy = resolve("example.com", &store, &defaults);
        assert!(!policy.javascript);
        assert_eq!(policy.source.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_defaults_read_at_resolution_time() {
        let store = js_store("example.com", Tristate::SystemDefault);
        let mut defaults = GlobalDefaults { javascript: false, ..GlobalDefaults::default() };
        assert!(!resolve("example.com", &store, &defaults).javascript);

        defaults.javascript = true;
        assert!(resolve("example.com", &store, &defaults).javascript);
    }

    #[test]
    fn test_empty_host_resolves_to_defaults() {
        let store = js_store("*.example.com", Tristate::Enabled);
        let defaults = GlobalDefaults::default();
        let policy = resolve("", &store, &defaults);
        assert_eq!(policy, EffectivePolicy::from_defaults(&defaults));
        assert!(policy.host.is_none());
    }

    #[test]
    fn test_annoyance_forces_social_off() {
        let mut record = DomainPolicyRecord::new("bank.example");
        record.fanboys_annoyance = Tristate::Enabled;
        record.fanboys_social = Tristate::Enabled;
        let store = DomainPolicyStore::from_records([record]);
        let defaults = GlobalDefaults { fanboys_annoyance: false, ..GlobalDefaults::default() };

        let policy = resolve("bank.example", &store, &defaults);
        assert!(policy.is_list_enabled(ListId::FanboysAnnoyance));
        assert!(!policy.is_list_enabled(ListId::FanboysSocial));
    }
}
