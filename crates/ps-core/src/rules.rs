//! Parsed filter rules and the per-list rule index
//!
//! A [`RuleList`] is built once by the list parser and never mutated
//! afterwards; it is shared read-only across every tab through an `Arc`.

use std::collections::HashMap;

use crate::domain::{is_subdomain_or_self, walk_host_suffixes};
use crate::types::{PartyMask, RequestContext, RuleAction, RuleFlags};
use crate::url::{find_literal, get_host_position, is_boundary_char, literal_at};

// =============================================================================
// Pattern
// =============================================================================

/// One step of an ABP-style pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    /// Literal text
    Lit(String),
    /// `*` - any run of characters, possibly empty
    Wildcard,
    /// `^` - one separator character or the end of the URL
    Separator,
}

/// Where a token pattern may start matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// Anywhere in the URL
    #[default]
    None,
    /// `|` - at the first character of the URL
    Left,
    /// `||` - at the start of the host or right after a `.` inside it
    Host,
}

/// A compiled match pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    Tokens {
        anchor: Anchor,
        tokens: Vec<PatternToken>,
        /// Trailing `|`: the match must reach the end of the URL
        right_anchor: bool,
    },
    Regex(regex::Regex),
}

impl Pattern {
    /// Compile the pattern part of a rule (options already stripped).
    pub fn from_abp(text: &str) -> Self {
        let (anchor, rest) = if let Some(rest) = text.strip_prefix("||") {
            (Anchor::Host, rest)
        } else if let Some(rest) = text.strip_prefix('|') {
            (Anchor::Left, rest)
        } else {
            (Anchor::None, text)
        };

        let (right_anchor, body) = match rest.strip_suffix('|') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        let mut tokens = Vec::new();
        let mut lit = String::new();
        for c in body.chars() {
            match c {
                '*' | '^' => {
                    if !lit.is_empty() {
                        tokens.push(PatternToken::Lit(std::mem::take(&mut lit)));
                    }
                    let token = if c == '*' { PatternToken::Wildcard } else { PatternToken::Separator };
                    // Consecutive wildcards collapse
                    if !(token == PatternToken::Wildcard && tokens.last() == Some(&PatternToken::Wildcard)) {
                        tokens.push(token);
                    }
                }
                _ => lit.push(c),
            }
        }
        if !lit.is_empty() {
            tokens.push(PatternToken::Lit(lit));
        }

        Pattern::Tokens { anchor, tokens, right_anchor }
    }

    /// Compile a `/regex/` rule body (slashes already stripped).
    pub fn from_regex(source: &str, match_case: bool) -> Result<Self, regex::Error> {
        let re = regex::RegexBuilder::new(source)
            .case_insensitive(!match_case)
            .build()?;
        Ok(Pattern::Regex(re))
    }

    /// Host this pattern is pinned to, if any.
    ///
    /// Only `||host^` and `||host/...` qualify: a match of either implies the
    /// request host is `host` or one of its subdomains.
    pub fn index_host(&self) -> Option<String> {
        let Pattern::Tokens { anchor: Anchor::Host, tokens, .. } = self else {
            return None;
        };
        let Some(PatternToken::Lit(first)) = tokens.first() else {
            return None;
        };

        let host = match first.find('/') {
            Some(slash) => &first[..slash],
            None if tokens.get(1) == Some(&PatternToken::Separator) => first.as_str(),
            None => return None,
        };

        let is_host_char = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_');
        if host.is_empty() || host.starts_with('.') || !host.bytes().all(is_host_char) {
            return None;
        }
        Some(host.to_ascii_lowercase())
    }

    /// Test the pattern against a full request URL.
    pub fn matches(&self, url: &str, match_case: bool) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(url),
            Pattern::Tokens { anchor, tokens, right_anchor } => {
                let bytes = url.as_bytes();
                let m = Matching { url: bytes, match_case, right_anchor: *right_anchor };
                match anchor {
                    Anchor::Left => m.match_at(0, tokens),
                    Anchor::None => m.match_anywhere(0, tokens),
                    Anchor::Host => {
                        let Some((host_start, host_end)) = get_host_position(url) else {
                            return false;
                        };
                        (host_start..host_end)
                            .filter(|&pos| pos == host_start || bytes[pos - 1] == b'.')
                            .any(|pos| m.match_at(pos, tokens))
                    }
                }
            }
        }
    }
}

/// Backtracking matcher state for one URL.
struct Matching<'u> {
    url: &'u [u8],
    match_case: bool,
    right_anchor: bool,
}

impl Matching<'_> {
    /// Try every start position at or after `from`.
    fn match_anywhere(&self, from: usize, tokens: &[PatternToken]) -> bool {
        match tokens.first() {
            Some(PatternToken::Lit(lit)) => {
                let mut pos = from;
                while let Some(found) = find_literal(self.url, lit.as_bytes(), pos, self.match_case) {
                    if self.match_at(found, tokens) {
                        return true;
                    }
                    pos = found + 1;
                }
                false
            }
            _ => (from..=self.url.len()).any(|pos| self.match_at(pos, tokens)),
        }
    }

    /// Match `tokens` starting exactly at `pos`.
    fn match_at(&self, pos: usize, tokens: &[PatternToken]) -> bool {
        let Some((token, rest)) = tokens.split_first() else {
            return !self.right_anchor || pos == self.url.len();
        };

        match token {
            PatternToken::Lit(lit) => {
                literal_at(self.url, lit.as_bytes(), pos, self.match_case)
                    && self.match_at(pos + lit.len(), rest)
            }
            PatternToken::Separator => {
                if pos == self.url.len() {
                    self.match_at(pos, rest)
                } else {
                    is_boundary_char(self.url[pos]) && self.match_at(pos + 1, rest)
                }
            }
            PatternToken::Wildcard => {
                if rest.is_empty() {
                    // Trailing `*` swallows the rest of the URL
                    return true;
                }
                self.match_anywhere(pos, rest)
            }
        }
    }
}

// =============================================================================
// Domain Restrictions
// =============================================================================

/// `$domain=` restriction on the document that issued the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRestriction {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl DomainRestriction {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether a rule carrying this restriction applies on `document_host`.
    pub fn applies(&self, document_host: Option<&str>) -> bool {
        if !self.include.is_empty() {
            let Some(host) = document_host else {
                return false;
            };
            if !self.include.iter().any(|d| is_subdomain_or_self(host, d)) {
                return false;
            }
        }

        match document_host {
            Some(host) => !self.exclude.iter().any(|d| is_subdomain_or_self(host, d)),
            None => true,
        }
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A single network filter.
#[derive(Debug, Clone)]
pub struct Rule {
    pub action: RuleAction,
    pub flags: RuleFlags,
    pub party: PartyMask,
    pub domains: DomainRestriction,
    pub pattern: Pattern,
    /// Original line, reported back when the rule decides a verdict
    pub text: String,
}

impl Rule {
    /// Check options first, then the URL pattern.
    pub fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        self.party.admits(ctx.is_third_party)
            && self.domains.applies(ctx.document_host)
            && self.pattern.matches(ctx.url, self.flags.contains(RuleFlags::MATCH_CASE))
    }
}

// =============================================================================
// Rule Index
// =============================================================================

/// Rules of one action, indexed by pinned host.
///
/// Rule ids are file positions, so the lowest matching id is the first
/// matching rule in file order.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    rules: Vec<Rule>,
    by_host: HashMap<String, Vec<u32>>,
    generic: Vec<u32>,
}

impl RuleIndex {
    fn push(&mut self, rule: Rule) {
        let id = self.rules.len() as u32;
        match rule.pattern.index_host() {
            Some(host) => self.by_host.entry(host).or_default().push(id),
            None => self.generic.push(id),
        }
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// First rule in file order that matches the request.
    pub fn first_match(&self, ctx: &RequestContext<'_>) -> Option<&Rule> {
        let mut best = self.first_matching_id(&self.generic, ctx, u32::MAX);

        if let Some(req_host) = ctx.req_host {
            let lowered = req_host.to_ascii_lowercase();
            for suffix in walk_host_suffixes(&lowered) {
                if let Some(ids) = self.by_host.get(suffix) {
                    let limit = best.unwrap_or(u32::MAX);
                    if let Some(id) = self.first_matching_id(ids, ctx, limit) {
                        best = Some(id);
                    }
                }
            }
        }

        best.map(|id| &self.rules[id as usize])
    }

    fn first_matching_id(&self, ids: &[u32], ctx: &RequestContext<'_>, limit: u32) -> Option<u32> {
        ids.iter()
            .copied()
            .take_while(|&id| id < limit)
            .find(|&id| self.rules[id as usize].matches(ctx))
    }
}

// =============================================================================
// Rule List
// =============================================================================

/// Counters collected while parsing one list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub rules: usize,
    pub skipped: usize,
}

/// An immutable parsed filter list.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    title: Option<String>,
    version: Option<String>,
    exceptions: RuleIndex,
    blocks: RuleIndex,
    stats: ParseStats,
}

impl RuleList {
    /// A list with no rules, used when an asset is missing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> RuleListBuilder {
        RuleListBuilder::default()
    }

    /// Version token from the list header, for display.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn exceptions(&self) -> &RuleIndex {
        &self.exceptions
    }

    pub fn blocks(&self) -> &RuleIndex {
        &self.blocks
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn rule_count(&self) -> usize {
        self.exceptions.len() + self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

/// Accumulates rules while a list is parsed.
#[derive(Debug, Default)]
pub struct RuleListBuilder {
    list: RuleList,
}

impl RuleListBuilder {
    /// Keeps the first version seen.
    pub fn version(&mut self, version: &str) -> &mut Self {
        if self.list.version.is_none() {
            self.list.version = Some(version.to_string());
        }
        self
    }

    /// Keeps the first title seen.
    pub fn title(&mut self, title: &str) -> &mut Self {
        if self.list.title.is_none() {
            self.list.title = Some(title.to_string());
        }
        self
    }

    pub fn line(&mut self) -> &mut Self {
        self.list.stats.lines += 1;
        self
    }

    pub fn skipped(&mut self) -> &mut Self {
        self.list.stats.skipped += 1;
        self
    }

    pub fn rule(&mut self, rule: Rule) -> &mut Self {
        self.list.stats.rules += 1;
        match rule.action {
            RuleAction::Allow => self.list.exceptions.push(rule),
            RuleAction::Block => self.list.blocks.push(rule),
        }
        self
    }

    pub fn build(self) -> RuleList {
        self.list
    }
}
