//! Filter Chain Orchestrator
//!
//! Invoked once per outgoing resource request. Stages run in a fixed order
//! and the first Blocked verdict ends the chain:
//!
//! 1. block-all-third-party, for third-party requests
//! 2. UltraPrivacy
//! 3. EasyList
//! 4. EasyPrivacy
//! 5. Fanboy's Annoyance, or Fanboy's Social when the annoyance list is off
//!
//! An exception hit is remembered (the latest one wins) but does not stop
//! later lists from blocking. Each decision is appended to the document's
//! request log exactly once.

use std::sync::Arc;

use crate::domain::is_third_party;
use crate::lists::Blocklists;
use crate::matcher::Matcher;
use crate::policy::EffectivePolicy;
use crate::requests::{RequestLog, RequestOutcome};
use crate::surface::InterceptResponse;
use crate::tab::Tab;
use crate::types::{Blocker, ListId, MatchResult, RequestContext, RequestVerdict};
use crate::url::extract_host;

/// Final decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDecision {
    pub verdict: RequestVerdict,
    pub blocker: Option<Blocker>,
    pub rule: Option<String>,
}

impl ChainDecision {
    pub fn is_blocked(&self) -> bool {
        self.verdict == RequestVerdict::Blocked
    }

    fn default_verdict() -> Self {
        Self { verdict: RequestVerdict::Default, blocker: None, rule: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    lists: Arc<Blocklists>,
}

impl FilterChain {
    pub fn new(lists: Arc<Blocklists>) -> Self {
        Self { lists }
    }

    pub fn lists(&self) -> &Blocklists {
        &self.lists
    }

    /// Decide a request made by the document `policy` was resolved for,
    /// and log the outcome.
    pub fn check_request(&self, policy: &EffectivePolicy, log: &RequestLog, url: &str) -> ChainDecision {
        let decision = self.decide(policy, url);
        log.record(RequestOutcome {
            verdict: decision.verdict,
            blocker: decision.blocker,
            rule: decision.rule.clone(),
            url: url.to_string(),
        });
        decision
    }

    /// Interception hook for the rendering surface.
    pub fn on_resource_request(&self, tab: &Tab, url: &str) -> InterceptResponse {
        let policy = tab.policy();
        if self.check_request(&policy, tab.requests(), url).is_blocked() {
            InterceptResponse::BlockedEmptyResponse
        } else {
            InterceptResponse::Allow
        }
    }

    fn decide(&self, policy: &EffectivePolicy, url: &str) -> ChainDecision {
        let document_host = policy.host.as_deref().unwrap_or("");
        let req_host = extract_host(url).unwrap_or("");
        let third_party = is_third_party(document_host, req_host);

        if policy.block_all_third_party && third_party {
            return ChainDecision {
                verdict: RequestVerdict::Blocked,
                blocker: Some(Blocker::ThirdPartyRequests),
                rule: None,
            };
        }

        let ctx = RequestContext::new(url, policy.host.as_deref(), third_party);
        let mut decision = ChainDecision::default_verdict();

        for id in Self::stages(policy) {
            match Matcher::new(self.lists.get(id)).check(&ctx) {
                MatchResult::Blocked { rule } => {
                    log::debug!("Blocked {} by {}: {}", url, id, rule);
                    return ChainDecision {
                        verdict: RequestVerdict::Blocked,
                        blocker: Some(Blocker::List(id)),
                        rule: Some(rule),
                    };
                }
                MatchResult::Allowed { rule } => {
                    decision = ChainDecision {
                        verdict: RequestVerdict::Allowed,
                        blocker: Some(Blocker::List(id)),
                        rule: Some(rule),
                    };
                }
                MatchResult::NoMatch => {}
            }
        }

        decision
    }

    /// Enabled lists in chain order.
    fn stages(policy: &EffectivePolicy) -> impl Iterator<Item = ListId> + '_ {
        let annoyance = if policy.fanboys_annoyance {
            Some(ListId::FanboysAnnoyance)
        } else if policy.fanboys_social {
            Some(ListId::FanboysSocial)
        } else {
            None
        };

        [ListId::UltraPrivacy, ListId::EasyList, ListId::EasyPrivacy]
            .into_iter()
            .filter(move |&id| policy.is_list_enabled(id))
            .chain(annoyance)
    }
}
