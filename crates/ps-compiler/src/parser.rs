//! Filter list parser
//!
//! Turns ABP-syntax list text into a [`RuleList`]. Parsing never fails:
//! a line the engine cannot honour is skipped and counted.

use std::net::IpAddr;

use ps_core::rules::{DomainRestriction, Pattern, Rule, RuleList, RuleListBuilder};
use ps_core::types::{PartyMask, RuleAction, RuleFlags};

/// Options that would change what a rule does beyond block/allow.
/// Honouring them as plain blocks would over-block, so such lines are dropped.
const UNSUPPORTED_OPTIONS: &[&str] = &[
    "csp",
    "websocket",
    "object",
    "popup",
    "document",
    "elemhide",
    "generichide",
    "genericblock",
    "redirect",
    "redirect-rule",
    "removeparam",
    "badfilter",
    "rewrite",
    "header",
    "permissions",
];

/// Resource types. The engine does not tell request types apart, so these
/// are accepted and ignored.
const TYPE_OPTIONS: &[&str] = &[
    "script",
    "image",
    "stylesheet",
    "css",
    "subdocument",
    "frame",
    "xmlhttprequest",
    "xhr",
    "media",
    "font",
    "ping",
    "beacon",
    "fetch",
    "other",
];

const HOSTS_FILE_IGNORED: &[&str] = &["localhost", "localhost.localdomain", "local", "broadcasthost", "0.0.0.0"];

/// Parse a whole list.
pub fn parse_filter_list(text: &str) -> RuleList {
    let mut builder = RuleList::builder();

    for raw_line in text.lines() {
        builder.line();
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('!') {
            read_header(comment, &mut builder);
            continue;
        }

        if line.starts_with('[') || line.starts_with('#') && !line.starts_with("##") {
            continue;
        }

        match parse_rule(line) {
            Ok(rule) => {
                builder.rule(rule);
            }
            Err(reason) => {
                log::debug!("Skipping filter {:?}: {}", line, reason);
                builder.skipped();
            }
        }
    }

    builder.build()
}

/// Version token of a parsed list, empty when the header had none.
pub fn version_of(list: &RuleList) -> &str {
    list.version().unwrap_or("")
}

fn read_header(comment: &str, builder: &mut RuleListBuilder) {
    let Some((key, value)) = comment.split_once(':') else {
        return;
    };
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    match key.trim().to_ascii_lowercase().as_str() {
        "version" => {
            builder.version(value);
        }
        "title" => {
            builder.title(value);
        }
        _ => {}
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Why a line did not become a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SkipReason {
    Cosmetic,
    UnsupportedOption(String),
    UnknownOption(String),
    BadDomainOption,
    ExceptionWithExcludedDomain,
    GenericException,
    EmptyPattern,
    BadRegex(String),
    HostsFileEntry,
    MalformedPattern,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Cosmetic => f.write_str("cosmetic filter"),
            SkipReason::UnsupportedOption(opt) => write!(f, "unsupported option {opt}"),
            SkipReason::UnknownOption(opt) => write!(f, "unknown option {opt}"),
            SkipReason::BadDomainOption => f.write_str("malformed domain= option"),
            SkipReason::ExceptionWithExcludedDomain => f.write_str("exception with excluded domain"),
            SkipReason::GenericException => f.write_str("generic scheme exception"),
            SkipReason::EmptyPattern => f.write_str("empty pattern"),
            SkipReason::BadRegex(err) => write!(f, "invalid regex: {err}"),
            SkipReason::HostsFileEntry => f.write_str("unusable hosts file entry"),
            SkipReason::MalformedPattern => f.write_str("whitespace or invalid text in pattern"),
        }
    }
}

fn parse_rule(line: &str) -> Result<Rule, SkipReason> {
    if is_cosmetic(line) {
        return Err(SkipReason::Cosmetic);
    }

    if let Some(entry) = hosts_file_entry(line) {
        let host = normalize_domain(entry)
            .filter(|host| !HOSTS_FILE_IGNORED.contains(&host.as_str()))
            .ok_or(SkipReason::HostsFileEntry)?;
        let text = format!("||{host}^");
        return Ok(Rule {
            action: RuleAction::Block,
            flags: RuleFlags::empty(),
            party: PartyMask::ALL,
            domains: DomainRestriction::default(),
            pattern: Pattern::from_abp(&text),
            text: line.to_string(),
        });
    }

    let (action, body) = match line.strip_prefix("@@") {
        Some(rest) => (RuleAction::Allow, rest.trim_start()),
        None => (RuleAction::Block, line),
    };

    let (pattern_part, options_text) = split_rule_options(body);
    let options = match options_text {
        Some(options_text) => parse_options(options_text)?,
        None => ParsedOptions::default(),
    };

    if action == RuleAction::Allow && !options.domains.exclude.is_empty() {
        return Err(SkipReason::ExceptionWithExcludedDomain);
    }

    let pattern_str = pattern_part.trim();
    if pattern_str.chars().any(|c| c.is_ascii_whitespace() || c == char::REPLACEMENT_CHARACTER) {
        return Err(SkipReason::MalformedPattern);
    }
    // A pattern without literal text matches every URL; only keep it when
    // a domain restriction narrows it down
    let has_literal = pattern_str.chars().any(|c| !matches!(c, '|' | '*' | '^'));
    if !has_literal && options.domains.include.is_empty() {
        return Err(SkipReason::EmptyPattern);
    }
    if action == RuleAction::Allow && is_bare_scheme(pattern_str) {
        return Err(SkipReason::GenericException);
    }

    let mut flags = options.flags;
    let pattern = match regex_source(pattern_str) {
        Some(source) => {
            flags |= RuleFlags::IS_REGEX;
            Pattern::from_regex(source, flags.contains(RuleFlags::MATCH_CASE))
                .map_err(|e| SkipReason::BadRegex(e.to_string()))?
        }
        None => Pattern::from_abp(pattern_str),
    };

    Ok(Rule {
        action,
        flags,
        party: options.party,
        domains: options.domains,
        pattern,
        text: line.to_string(),
    })
}

fn is_cosmetic(line: &str) -> bool {
    ["##", "#@#", "#?#", "#$#", "#@$#", "#@?#"].iter().any(|marker| line.contains(marker))
}

/// `|http://` style exceptions would allow everything on a scheme.
fn is_bare_scheme(pattern: &str) -> bool {
    let bare = pattern.trim_start_matches('|').trim_end_matches(['|', '*']);
    matches!(bare.to_ascii_lowercase().as_str(), "http://" | "https://" | "http:" | "https:")
}

/// Body of a `/.../` rule that is meant as a regex. Plain path rules like
/// `/banner/` have no regex syntax and stay substring patterns.
fn regex_source(pattern: &str) -> Option<&str> {
    if pattern.len() <= 2 || !pattern.starts_with('/') || !pattern.ends_with('/') {
        return None;
    }
    let body = &pattern[1..pattern.len() - 1];
    body.contains(['\\', '[', ']', '(', ')', '{', '}', '?', '+', '$', '|'])
        .then_some(body)
}

fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    // A regex body may itself contain '$'; its options follow the closing '/'
    if line.starts_with('/') {
        if let Some(pos) = line.rfind("/$").filter(|&pos| pos > 0) {
            return (&line[..pos + 1], Some(&line[pos + 2..]));
        }
        if regex_source(line).is_some() {
            return (line, None);
        }
    }

    match line.find('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

/// Host column of a hosts-file line (`0.0.0.0 tracker.example`).
fn hosts_file_entry(line: &str) -> Option<&str> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;
    first.parse::<IpAddr>().is_ok().then_some(second)
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone)]
struct ParsedOptions {
    flags: RuleFlags,
    party: PartyMask,
    domains: DomainRestriction,
}

impl Default for ParsedOptions {
    fn default() -> Self {
        Self {
            flags: RuleFlags::empty(),
            party: PartyMask::ALL,
            domains: DomainRestriction::default(),
        }
    }
}

fn parse_options(text: &str) -> Result<ParsedOptions, SkipReason> {
    let mut flags = RuleFlags::empty();
    let mut party_include = PartyMask::empty();
    let mut party_exclude = PartyMask::empty();
    let mut domains = DomainRestriction::default();

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if raw_lower == "important" {
            flags |= RuleFlags::IMPORTANT;
            continue;
        }

        if raw_lower == "match-case" {
            flags |= RuleFlags::MATCH_CASE;
            continue;
        }

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            parse_domain_option(domain_value, &mut domains)?;
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };
        let option_name = name.split('=').next().unwrap_or(name);

        if UNSUPPORTED_OPTIONS.contains(&option_name) {
            return Err(SkipReason::UnsupportedOption(raw.to_string()));
        }

        if let Some(mask) = party_mask(name) {
            if negated {
                party_exclude |= mask;
            } else {
                party_include |= mask;
            }
            continue;
        }

        if TYPE_OPTIONS.contains(&name) {
            continue;
        }

        return Err(SkipReason::UnknownOption(raw.to_string()));
    }

    let mut party = if party_include.is_empty() { PartyMask::ALL } else { party_include };
    party.remove(party_exclude);
    if party.is_empty() {
        // `$third-party,~third-party` can never match
        return Err(SkipReason::UnknownOption(text.to_string()));
    }

    Ok(ParsedOptions { flags, party, domains })
}

fn parse_domain_option(value: &str, domains: &mut DomainRestriction) -> Result<(), SkipReason> {
    let before = domains.include.len() + domains.exclude.len();

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = normalize_domain(domain_raw).ok_or(SkipReason::BadDomainOption)?;
        if is_exclude {
            domains.exclude.push(domain);
        } else {
            domains.include.push(domain);
        }
    }

    if domains.include.len() + domains.exclude.len() == before {
        return Err(SkipReason::BadDomainOption);
    }
    Ok(())
}

fn party_mask(name: &str) -> Option<PartyMask> {
    match name {
        "third-party" | "thirdparty" | "3p" => Some(PartyMask::THIRD_PARTY),
        "first-party" | "firstparty" | "1p" => Some(PartyMask::FIRST_PARTY),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::matcher::check;
    use ps_core::types::MatchResult;

    #[test]
    fn test_header_and_comments() {
        let list = parse_filter_list(
            "[Adblock Plus 2.0]\n! Title: EasyList\n! Version: 202610161200\n! Version: 1\n! Homepage: x\n\n# hosts comment\n",
        );
        assert_eq!(list.title(), Some("EasyList"));
        assert_eq!(version_of(&list), "202610161200");
        assert!(list.is_empty());
        assert_eq!(list.stats().lines, 7);
        assert_eq!(list.stats().skipped, 0);
    }

    #[test]
    fn test_missing_version() {
        assert_eq!(version_of(&parse_filter_list("||ads.com^")), "");
    }

    #[test]
    fn test_cosmetic_lines_are_skipped() {
        let list = parse_filter_list("example.com##.ad\n##.banner\nexample.com#@#.ad\nexample.com#?#div:has(.ad)\n");
        assert!(list.is_empty());
        assert_eq!(list.stats().skipped, 4);
    }

    #[test]
    fn test_exception_and_block_split() {
        let list = parse_filter_list("||ads.com^\n@@||ads.com/ok^\n/banner/*\n");
        assert_eq!(list.blocks().len(), 2);
        assert_eq!(list.exceptions().len(), 1);
        assert_eq!(list.stats().rules, 3);
    }

    #[test]
    fn test_party_options() {
        let list = parse_filter_list("/pixel.$third-party\n/beacon.$~third-party\n/track.$1p\n");
        let rules: Vec<_> = list.blocks().iter().map(|r| r.party).collect();
        assert_eq!(rules, vec![PartyMask::THIRD_PARTY, PartyMask::FIRST_PARTY, PartyMask::FIRST_PARTY]);
        assert!(parse_filter_list("/x$third-party,~third-party").is_empty());
    }

    #[test]
    fn test_domain_option() {
        let list = parse_filter_list("/widget.js$domain=News.com|~safe.news.com,script\n");
        let rule = list.blocks().iter().next().unwrap();
        assert_eq!(rule.domains.include, vec!["news.com".to_string()]);
        assert_eq!(rule.domains.exclude, vec!["safe.news.com".to_string()]);
        assert!(parse_filter_list("/x$domain=").is_empty());
        assert!(parse_filter_list("/x$domain=bad/host").is_empty());
    }

    #[test]
    fn test_unsupported_and_unknown_options_skip_line() {
        for line in [
            "||ads.com^$csp=script-src 'none'",
            "||ads.com^$websocket",
            "||ads.com^$popup",
            "||ads.com^$redirect=noop.js",
            "||ads.com^$removeparam=utm_source",
            "||ads.com^$~object",
            "||ads.com^$frobnicate",
        ] {
            let list = parse_filter_list(line);
            assert!(list.is_empty(), "{line} should be skipped");
            assert_eq!(list.stats().skipped, 1);
        }
    }

    #[test]
    fn test_type_options_are_ignored() {
        let list = parse_filter_list("||ads.com^$script,image,~stylesheet,important");
        let rule = list.blocks().iter().next().unwrap();
        assert!(rule.flags.contains(RuleFlags::IMPORTANT));
        assert_eq!(rule.party, PartyMask::ALL);
    }

    #[test]
    fn test_skipped_exceptions() {
        let list = parse_filter_list("@@/ads.js$domain=~example.com\n@@|http://\n@@|https://$image\n@@/ads.js$domain=example.com\n");
        assert_eq!(list.exceptions().len(), 1);
        assert_eq!(list.stats().skipped, 3);
    }

    #[test]
    fn test_regex_rules() {
        let list = parse_filter_list("/^https?://[a-z]+\\.tracker\\./$third-party\n/(unclosed/\n/ads$/\n");
        assert_eq!(list.blocks().len(), 2);
        assert_eq!(list.stats().skipped, 1);
        let first = list.blocks().iter().next().unwrap();
        assert!(first.flags.contains(RuleFlags::IS_REGEX));
        assert_eq!(first.party, PartyMask::THIRD_PARTY);
    }

    #[test]
    fn test_slash_wrapped_paths_are_not_regexes() {
        let list = parse_filter_list("/ad/\n/banner/$third-party\n");
        assert_eq!(list.blocks().len(), 2);
        assert!(list.blocks().iter().all(|r| !r.flags.contains(RuleFlags::IS_REGEX)));

        assert_eq!(check("example.com", "https://example.com/download.js", false, &list), MatchResult::NoMatch);
        assert!(check("example.com", "https://example.com/ad/x.js", false, &list).is_blocked());
        assert_eq!(check("a.com", "https://cdn.net/mybannerimage.png", true, &list), MatchResult::NoMatch);
        assert!(check("a.com", "https://cdn.net/banner/1.png", true, &list).is_blocked());
    }

    #[test]
    fn test_patterns_with_whitespace_are_skipped() {
        let list = parse_filter_list("this is not a filter\n||ads.com^\n\u{fffd}\u{fffd} junk\n/ads /$domain=a.com\n");
        assert_eq!(list.rule_count(), 1);
        assert_eq!(list.stats().skipped, 3);
        assert_eq!(check("a.com", "https://a.com/this is not a filter", false, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_hosts_file_lines() {
        let list = parse_filter_list("127.0.0.1 localhost\n0.0.0.0 Tracker.example\n0.0.0.0 0.0.0.0\n");
        assert_eq!(list.blocks().len(), 1);
        assert!(check("a.com", "https://cdn.tracker.example/p.gif", true, &list).is_blocked());
    }

    #[test]
    fn test_match_case() {
        let list = parse_filter_list("/AdServer/$match-case\n");
        assert!(check("a.com", "https://x.com/AdServer/1", false, &list).is_blocked());
        assert_eq!(check("a.com", "https://x.com/adserver/1", false, &list), MatchResult::NoMatch);
    }

    #[test]
    fn test_whitelist_precedence_within_list() {
        let list = parse_filter_list("@@||good.com^\n||good.com/ads^\n");
        let result = check("good.com", "https://good.com/ads/banner.js", false, &list);
        assert_eq!(result, MatchResult::Allowed { rule: "@@||good.com^".into() });
    }

    #[test]
    fn test_malformed_input_never_panics() {
        let list = parse_filter_list("$$$\n@@\n||\n|\n/\n//\n***\n^^^\n@@$third-party\n\u{feff}||é.com^\n");
        assert_eq!(list.stats().lines, 10);
        for pattern in ["||", "|", "***", "^^^"] {
            assert!(!list.blocks().iter().any(|r| r.text == pattern), "{pattern} should be skipped");
        }
    }
}
