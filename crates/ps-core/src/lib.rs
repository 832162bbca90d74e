//! PrivShield Core Library
//!
//! Domain-scoped policy resolution and content-request filtering for a
//! privacy browser.
//!
//! # Architecture
//!
//! On every navigation the [`Tab`] resolves an [`EffectivePolicy`] for the
//! document host from the [`DomainPolicyStore`] and the [`GlobalDefaults`].
//! Every sub-resource request then passes through the [`FilterChain`], which
//! runs the enabled [`RuleList`]s in a fixed order and logs the outcome in
//! the tab's [`RequestLog`]. Rule lists are parsed once at startup and are
//! shared read-only between tabs.
//!
//! # Modules
//!
//! - `domain`: Base-domain reduction and third-party classification
//! - `url`: Fast URL parsing without allocations
//! - `rules`: Rule patterns, rule index and parsed rule lists
//! - `matcher`: Single-list verdicts with exception precedence
//! - `lists`: The set of named lists
//! - `chain`: Per-request filter chain
//! - `requests`: Per-document request log and counters
//! - `policy`: Tristate fields, domain records, defaults, effective policy
//! - `store`: Domain record lookup with wildcard ancestors
//! - `resolver`: Record + defaults merge
//! - `tab`: Per-tab state and navigation hook
//! - `surface`: Rendering engine seam
//! - `pinning`: Pinned certificate / IP verification
//! - `types`: Shared type definitions

pub mod chain;
pub mod domain;
pub mod lists;
pub mod matcher;
pub mod pinning;
pub mod policy;
pub mod requests;
pub mod resolver;
pub mod rules;
pub mod store;
pub mod surface;
pub mod tab;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use chain::{ChainDecision, FilterChain};
pub use domain::{base_domain, is_third_party};
pub use lists::Blocklists;
pub use matcher::{check, Matcher};
pub use pinning::{CertificateInfo, IpMatchMode, PinCheck, PinMismatch, PinnedCertificate, PinningVerifier, Pins};
pub use policy::{DomainPolicyRecord, EffectivePolicy, GlobalDefaults, Tristate, UserAgent};
pub use requests::{RequestLog, RequestOutcome};
pub use resolver::resolve;
pub use rules::{Rule, RuleList, RuleListBuilder};
pub use store::DomainPolicyStore;
pub use surface::{InterceptResponse, RenderingSurface};
pub use tab::{PolicyChange, Tab};
pub use types::{Blocker, ListId, MatchResult, ParseListIdError, RequestContext, RequestVerdict, RuleAction};
