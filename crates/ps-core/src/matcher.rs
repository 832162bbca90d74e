//! Blocklist Matcher
//!
//! Runs one request against one rule list. Exception rules are consulted
//! first; an exception hit wins over any block rule of the same list.
//! Nothing here can fail: a URL without a parseable host never matches.

use crate::rules::RuleList;
use crate::types::{MatchResult, RequestContext};

// =============================================================================
// Matcher
// =============================================================================

/// Matching view over a single rule list.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    list: &'a RuleList,
}

impl<'a> Matcher<'a> {
    pub fn new(list: &'a RuleList) -> Self {
        Self { list }
    }

    /// Match a request and return the list's verdict.
    pub fn check(&self, ctx: &RequestContext<'_>) -> MatchResult {
        if ctx.req_host.is_none() {
            return MatchResult::NoMatch;
        }

        if let Some(rule) = self.list.exceptions().first_match(ctx) {
            return MatchResult::Allowed { rule: rule.text.clone() };
        }

        if let Some(rule) = self.list.blocks().first_match(ctx) {
            return MatchResult::Blocked { rule: rule.text.clone() };
        }

        MatchResult::NoMatch
    }
}

/// Check `url`, requested by a document on `document_domain`, against `list`.
pub fn check(document_domain: &str, url: &str, is_third_party: bool, list: &RuleList) -> MatchResult {
    let document_host = Some(document_domain);
    Matcher::new(list).check(&RequestContext::new(url, document_host, is_third_party))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{DomainRestriction, Pattern, Rule};
    use crate::types::{PartyMask, RuleAction, RuleFlags};

    fn rule(action: RuleAction, pattern: &str) -> Rule {
        Rule {
            action,
            flags: RuleFlags::empty(),
            party: PartyMask::ALL,
            domains: DomainRestriction::default(),
            pattern: Pattern::from_abp(pattern),
            text: match action {
                RuleAction::Allow => format!("@@{pattern}"),
                RuleAction::Block => pattern.to_string(),
            },
        }
    }

    fn list(rules: Vec<Rule>) -> RuleList {
        let mut builder = RuleList::builder();
        for r in rules {
            builder.rule(r);
        }
        builder.build()
    }

    #[test]
    fn test_exception_wins_within_list() {
        let list = list(vec![
            rule(RuleAction::Block, "||good.com/ads^"),
            rule(RuleAction::Allow, "||good.com^"),
        ]);
        let result = check("good.com", "https://good.com/ads/banner.js", false, &list);
        assert_eq!(result, MatchResult::Allowed { rule: "@@||good.com^".into() });
    }

    #[test]
    fn test_block_and_no_match() {
        let list = list(vec![rule(RuleAction::Block, "||tracker.net^")]);
        let blocked = check("news.com", "https://px.tracker.net/p.gif", true, &list);
        assert!(blocked.is_blocked());
        assert_eq!(blocked.rule(), Some("||tracker.net^"));
        assert_eq!(check("news.com", "https://news.com/app.js", false, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_third_party_only_rule() {
        let mut r = rule(RuleAction::Block, "/pixel.");
        r.party = PartyMask::THIRD_PARTY;
        let list = list(vec![r]);
        assert!(check("a.com", "https://b.com/pixel.gif", true, &list).is_blocked());
        assert_eq!(check("a.com", "https://a.com/pixel.gif", false, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_domain_restricted_rule() {
        let mut r = rule(RuleAction::Block, "/widget.js");
        r.domains.include.push("news.com".into());
        let list = list(vec![r]);
        assert!(check("www.news.com", "https://cdn.net/widget.js", true, &list).is_blocked());
        assert_eq!(check("blog.org", "https://cdn.net/widget.js", true, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_unparseable_url_is_no_match() {
        let list = list(vec![rule(RuleAction::Block, "ads")]);
        assert_eq!(check("a.com", "ads ads ads", false, &list), MatchResult::NoMatch);
        assert_eq!(check("a.com", "about:blank#ads", false, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            check("a.com", "https://a.com/", false, &RuleList::empty()),
            MatchResult::NoMatch
        );
    }
}
