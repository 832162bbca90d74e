//! Per-tab document state
//!
//! Each tab owns its effective policy snapshot and request log; only the
//! rule lists and the policy store are shared between tabs.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::pinning::{CertificateInfo, PinCheck, PinMismatch, PinningVerifier};
use crate::policy::{EffectivePolicy, GlobalDefaults};
use crate::requests::RequestLog;
use crate::resolver::resolve;
use crate::store::DomainPolicyStore;
use crate::url::extract_host;

/// What changed when a navigation reached a new host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub host: String,
    /// Key of the domain record now in effect, if any
    pub custom_settings: Option<String>,
    /// The user agent changed; the load must restart to present it
    pub reload_required: bool,
}

#[derive(Debug)]
struct TabState {
    host: Option<String>,
    policy: Arc<EffectivePolicy>,
    ignore_pinned: bool,
}

#[derive(Debug)]
pub struct Tab {
    state: RwLock<TabState>,
    requests: RequestLog,
}

impl Tab {
    /// A tab that has not navigated yet runs on the defaults.
    pub fn new(defaults: &GlobalDefaults) -> Self {
        Self {
            state: RwLock::new(TabState {
                host: None,
                policy: Arc::new(EffectivePolicy::from_defaults(defaults)),
                ignore_pinned: false,
            }),
            requests: RequestLog::new(),
        }
    }

    /// Navigation hook. Clears the request log and re-resolves the policy
    /// only when the document host differs from the last resolved one.
    pub fn on_document_start(
        &self,
        url: &str,
        store: &DomainPolicyStore,
        defaults: &GlobalDefaults,
    ) -> Option<PolicyChange> {
        let host = extract_host(url).unwrap_or("");
        let mut state = self.state.write();
        self.requests.clear();
        if state.host.as_deref() == Some(host) {
            return None;
        }

        let policy = resolve(host, store, defaults);
        let reload_required = policy.user_agent != state.policy.user_agent;
        let change = PolicyChange {
            host: host.to_string(),
            custom_settings: policy.source.clone(),
            reload_required,
        };
        log::info!(
            "Resolved policy for {:?} (custom settings: {:?})",
            host,
            change.custom_settings
        );

        state.host = Some(host.to_string());
        state.policy = Arc::new(policy);
        state.ignore_pinned = false;
        Some(change)
    }

    /// Current snapshot. Cheap to clone and safe to hold across requests.
    pub fn policy(&self) -> Arc<EffectivePolicy> {
        Arc::clone(&self.state.read().policy)
    }

    /// Apply a user toggle to the current snapshot, copy-on-write.
    pub fn update_policy<F>(&self, f: F)
    where
        F: FnOnce(&mut EffectivePolicy),
    {
        let mut state = self.state.write();
        f(Arc::make_mut(&mut state.policy));
    }

    pub fn current_host(&self) -> Option<String> {
        self.state.read().host.clone()
    }

    pub fn requests(&self) -> &RequestLog {
        &self.requests
    }

    /// The user chose to proceed past a pinned mismatch on this domain.
    pub fn ignore_pinned_mismatch(&self) {
        self.state.write().ignore_pinned = true;
    }

    pub fn is_ignoring_pins(&self) -> bool {
        self.state.read().ignore_pinned
    }

    /// A mismatch that should be surfaced to the user, if any.
    pub fn pinned_mismatch(
        &self,
        verifier: &PinningVerifier,
        observed_cert: Option<&CertificateInfo>,
        observed_ips: Option<&BTreeSet<IpAddr>>,
    ) -> Option<PinMismatch> {
        let state = self.state.read();
        if state.ignore_pinned {
            return None;
        }
        match verifier.verify(observed_cert, observed_ips, &state.policy.pins) {
            PinCheck::Mismatch(mismatch) => Some(mismatch),
            PinCheck::NothingPinned | PinCheck::Matched => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DomainPolicyRecord, Tristate, UserAgent};
    use crate::requests::RequestOutcome;
    use crate::types::{ListId, RequestVerdict};

    fn store() -> DomainPolicyStore {
        let mut js = DomainPolicyRecord::new("*.example.com");
        js.javascript = Tristate::Enabled;
        let mut ua = DomainPolicyRecord::new("legacy.org");
        ua.user_agent = Some(UserAgent::EngineDefault);
        ua.pins.ip_addresses = Some(["192.0.2.1".parse().unwrap()].into_iter().collect());
        DomainPolicyStore::from_records([js, ua])
    }

    fn note(tab: &Tab) {
        tab.requests().record(RequestOutcome {
            verdict: RequestVerdict::Default,
            blocker: None,
            rule: None,
            url: "https://x/".into(),
        });
    }

    #[test]
    fn test_resolves_only_on_host_change() {
        let defaults = GlobalDefaults::default();
        let store = store();
        let tab = Tab::new(&defaults);

        let change = tab.on_document_start("https://www.example.com/", &store, &defaults).unwrap();
        assert_eq!(change.custom_settings.as_deref(), Some("*.example.com"));
        assert!(!change.reload_required);
        assert!(tab.policy().javascript);

        // User toggle survives same-host navigation
        tab.update_policy(|p| p.javascript = false);
        assert!(tab.on_document_start("https://www.example.com/other#frag", &store, &defaults).is_none());
        assert!(!tab.policy().javascript);

        let change = tab.on_document_start("https://news.org/", &store, &defaults).unwrap();
        assert_eq!(change.custom_settings, None);
        assert!(!tab.policy().javascript);
    }

    #[test]
    fn test_navigation_clears_request_log() {
        let defaults = GlobalDefaults::default();
        let store = store();
        let tab = Tab::new(&defaults);
        tab.on_document_start("https://a.com/", &store, &defaults);
        note(&tab);
        assert_eq!(tab.requests().len(), 1);
        tab.on_document_start("https://a.com/next", &store, &defaults);
        assert!(tab.requests().is_empty());
    }

    #[test]
    fn test_new_host_starts_with_empty_log() {
        let defaults = GlobalDefaults::default();
        let store = store();
        let tab = Tab::new(&defaults);
        tab.on_document_start("https://a.com/", &store, &defaults);
        note(&tab);
        note(&tab);

        let change = tab.on_document_start("https://www.example.com/", &store, &defaults);
        assert!(change.is_some());
        assert!(tab.requests().is_empty());
        assert_eq!(tab.requests().blocked_count(), 0);
    }

    #[test]
    fn test_user_agent_change_requires_reload() {
        let defaults = GlobalDefaults::default();
        let store = store();
        let tab = Tab::new(&defaults);
        let change = tab.on_document_start("https://legacy.org/", &store, &defaults).unwrap();
        assert!(change.reload_required);
        let change = tab.on_document_start("https://a.com/", &store, &defaults).unwrap();
        assert!(change.reload_required);
    }

    #[test]
    fn test_update_policy_does_not_touch_held_snapshot() {
        let defaults = GlobalDefaults::default();
        let tab = Tab::new(&defaults);
        let before = tab.policy();
        tab.update_policy(|p| {
            p.set_blocklist(ListId::EasyList, false);
        });
        assert!(before.easylist);
        assert!(!tab.policy().easylist);
    }

    #[test]
    fn test_ignored_pin_mismatch_resets_on_domain_change() {
        let defaults = GlobalDefaults::default();
        let store = store();
        let verifier = PinningVerifier::default();
        let tab = Tab::new(&defaults);
        let observed: BTreeSet<IpAddr> = ["198.51.100.1".parse().unwrap()].into_iter().collect();

        tab.on_document_start("https://legacy.org/", &store, &defaults);
        assert!(tab.pinned_mismatch(&verifier, None, Some(&observed)).is_some());

        tab.ignore_pinned_mismatch();
        assert!(tab.pinned_mismatch(&verifier, None, Some(&observed)).is_none());

        tab.on_document_start("https://a.com/", &store, &defaults);
        assert!(!tab.is_ignoring_pins());
        tab.on_document_start("https://legacy.org/", &store, &defaults);
        assert!(tab.pinned_mismatch(&verifier, None, Some(&observed)).is_some());
    }
}
