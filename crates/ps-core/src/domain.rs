//! Base-domain utilities for first-party / third-party classification
//!
//! The base domain is a simplified registrable domain: leading labels are
//! stripped until at most one `.` remains. No public suffix data is
//! consulted and hostnames are not normalized; callers lowercase and trim
//! trailing dots before calling in.
//!
//! # Examples
//!
//! ```
//! use ps_core::domain::{base_domain, is_third_party};
//!
//! assert_eq!(base_domain("a.b.example.com"), "example.com");
//! assert!(!is_third_party("a.example.com", "b.example.com"));
//! assert!(is_third_party("example.com", "tracker.net"));
//! ```

/// Reduce a hostname to its last two labels.
pub fn base_domain(host: &str) -> &str {
    let mut current = host;
    while current.bytes().filter(|&b| b == b'.').count() > 1 {
        match get_parent_domain(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Check if two hosts share the same base domain.
pub fn is_same_site(host1: &str, host2: &str) -> bool {
    base_domain(host1) == base_domain(host2)
}

/// Check if a request is third-party.
///
/// Empty hosts are never third-party; classification fails open.
pub fn is_third_party(document_host: &str, req_host: &str) -> bool {
    if document_host.is_empty() || req_host.is_empty() {
        return false;
    }
    !is_same_site(document_host, req_host)
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Whether `host` is `domain` or one of its subdomains.
pub fn is_subdomain_or_self(host: &str, domain: &str) -> bool {
    if domain.is_empty() || host.len() < domain.len() {
        return false;
    }
    if host.len() == domain.len() {
        return host.eq_ignore_ascii_case(domain);
    }
    let split = host.len() - domain.len();
    host.as_bytes()[split - 1] == b'.'
        && host.is_char_boundary(split)
        && host[split..].eq_ignore_ascii_case(domain)
}

/// Iterator for suffix-walking a host from full host to its last label.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> HostSuffixIter<'a> {
    pub fn new(host: &'a str) -> Self {
        Self {
            current: if host.is_empty() { None } else { Some(host) },
        }
    }
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter::new(host)
}
