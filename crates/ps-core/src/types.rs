//! Core type definitions for PrivShield
//!
//! These types are shared by the rule lists, the matcher, and the
//! filter chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Rule Actions
// =============================================================================

/// Action to take for a matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuleAction {
    /// Exception rule (@@...) - allows the request
    Allow = 0,
    /// Block rule - cancels the request
    Block = 1,
}

// =============================================================================
// Rule Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags for rule behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuleFlags: u16 {
        /// $important - accepted for compatibility, no effect on precedence
        const IMPORTANT = 1 << 0;
        /// Pattern is a regex
        const IS_REGEX = 1 << 1;
        /// Case-sensitive matching ($match-case)
        const MATCH_CASE = 1 << 2;
    }
}

// =============================================================================
// Party Masks
// =============================================================================

bitflags::bitflags! {
    /// Party (first-party / third-party) mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PartyMask: u8 {
        /// Matches first-party requests
        const FIRST_PARTY = 1 << 0;
        /// Matches third-party requests
        const THIRD_PARTY = 1 << 1;
        /// Matches both
        const ALL = Self::FIRST_PARTY.bits() | Self::THIRD_PARTY.bits();
    }
}

impl PartyMask {
    /// Whether a request with the given classification passes this mask.
    #[inline]
    pub fn admits(self, is_third_party: bool) -> bool {
        if is_third_party {
            self.contains(Self::THIRD_PARTY)
        } else {
            self.contains(Self::FIRST_PARTY)
        }
    }
}

// =============================================================================
// Blocklists
// =============================================================================

/// The named filter lists bundled with the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListId {
    EasyList,
    EasyPrivacy,
    FanboysAnnoyance,
    FanboysSocial,
    UltraPrivacy,
}

impl ListId {
    pub const ALL: [ListId; 5] = [
        ListId::EasyList,
        ListId::EasyPrivacy,
        ListId::FanboysAnnoyance,
        ListId::FanboysSocial,
        ListId::UltraPrivacy,
    ];

    /// File name of the bundled asset.
    pub fn asset_name(self) -> &'static str {
        match self {
            ListId::EasyList => "easylist.txt",
            ListId::EasyPrivacy => "easyprivacy.txt",
            ListId::FanboysAnnoyance => "fanboy-annoyance.txt",
            ListId::FanboysSocial => "fanboy-social.txt",
            ListId::UltraPrivacy => "ultraprivacy.txt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ListId::EasyList => "EasyList",
            ListId::EasyPrivacy => "EasyPrivacy",
            ListId::FanboysAnnoyance => "Fanboy's Annoyance List",
            ListId::FanboysSocial => "Fanboy's Social Blocking List",
            ListId::UltraPrivacy => "UltraPrivacy",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ListId::EasyList => "easylist",
            ListId::EasyPrivacy => "easyprivacy",
            ListId::FanboysAnnoyance => "fanboys-annoyance",
            ListId::FanboysSocial => "fanboys-social",
            ListId::UltraPrivacy => "ultraprivacy",
        }
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error returned when a list name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown blocklist: {0}")]
pub struct ParseListIdError(pub String);

impl FromStr for ListId {
    type Err = ParseListIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ListId::ALL
            .into_iter()
            .find(|id| id.slug() == lower || id.asset_name() == lower)
            .ok_or_else(|| ParseListIdError(s.to_string()))
    }
}

/// What caused a request to be blocked: a named list, or the
/// block-all-third-party setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    List(ListId),
    ThirdPartyRequests,
}

impl Blocker {
    pub(crate) const COUNT: usize = ListId::ALL.len() + 1;

    pub(crate) fn counter_index(self) -> usize {
        match self {
            Blocker::List(id) => id as usize,
            Blocker::ThirdPartyRequests => ListId::ALL.len(),
        }
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::List(id) => write!(f, "{}", id),
            Blocker::ThirdPartyRequests => f.write_str("third-party"),
        }
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Context for a request being matched against a single list.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// Full request URL
    pub url: &'a str,
    /// Request hostname (extracted from URL)
    pub req_host: Option<&'a str>,
    /// Hostname of the document that issued the request
    pub document_host: Option<&'a str>,
    /// Is this a third-party request?
    pub is_third_party: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(url: &'a str, document_host: Option<&'a str>, is_third_party: bool) -> Self {
        Self {
            url,
            req_host: crate::url::extract_host(url).filter(|h| !h.is_empty()),
            document_host: document_host.filter(|h| !h.is_empty()),
            is_third_party,
        }
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// Verdict of a single rule list for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// A block rule matched and no exception rule did.
    Blocked { rule: String },
    /// An exception rule matched.
    Allowed { rule: String },
    /// Nothing in the list applies.
    NoMatch,
}

impl MatchResult {
    pub fn is_blocked(&self) -> bool {
        matches!(self, MatchResult::Blocked { .. })
    }

    /// Text of the rule that decided the verdict.
    pub fn rule(&self) -> Option<&str> {
        match self {
            MatchResult::Blocked { rule } | MatchResult::Allowed { rule } => Some(rule),
            MatchResult::NoMatch => None,
        }
    }
}

/// Final verdict of the filter chain, as recorded in the request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestVerdict {
    Blocked,
    /// An exception rule matched and nothing later blocked the request.
    Allowed,
    /// Nothing matched; the request is permitted.
    Default,
}
