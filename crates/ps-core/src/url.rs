//! Fast URL parsing utilities for the hot path
//!
//! These functions avoid allocations and work directly on string slices.
//! A URL that none of them can make sense of is treated by callers as
//! matching nothing.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(is_scheme_char) {
        return None;
    }

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

fn is_scheme_char(b: &u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Authority ends at the first of '/', '?', '#'
    let authority_end = bytes[scheme_end..]
        .iter()
        .position(|&b| b == b'/' || b == b'?' || b == b'#')
        .map_or(bytes.len(), |i| scheme_end + i);

    // Skip userinfo
    let host_start = bytes[scheme_end..authority_end]
        .iter()
        .rposition(|&b| b == b'@')
        .map_or(scheme_end, |i| scheme_end + i + 1);

    // Bracketed IPv6 literal keeps its colons
    let host_end = if bytes.get(host_start) == Some(&b'[') {
        bytes[host_start..authority_end]
            .iter()
            .position(|&b| b == b']')
            .map_or(authority_end, |i| host_start + i + 1)
    } else {
        bytes[host_start..authority_end]
            .iter()
            .position(|&b| b == b':')
            .map_or(authority_end, |i| host_start + i)
    };

    Some((host_start, host_end))
}

// =============================================================================
// ABP Separator Check
// =============================================================================

/// Check if a character is an ABP separator (the `^` placeholder).
/// Anything but a letter, a digit, or one of `_ - . %` is a separator.
#[inline]
pub fn is_boundary_char(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b'%'))
}

/// Check if position in string is at a boundary.
/// The end of the string counts as a boundary.
#[inline]
pub fn is_at_boundary(s: &str, pos: usize) -> bool {
    if pos >= s.len() {
        return true;
    }
    is_boundary_char(s.as_bytes()[pos])
}

// =============================================================================
// Literal Search
// =============================================================================

/// Find `needle` in `haystack` starting at `from`, optionally ignoring ASCII case.
pub fn find_literal(haystack: &[u8], needle: &[u8], from: usize, match_case: bool) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    if needle.len() > haystack.len() - from {
        return None;
    }

    let last = haystack.len() - needle.len();
    (from..=last).find(|&i| literal_at(haystack, needle, i, match_case))
}

/// Whether `needle` occurs in `haystack` exactly at `pos`.
#[inline]
pub fn literal_at(haystack: &[u8], needle: &[u8], pos: usize, match_case: bool) -> bool {
    let Some(window) = haystack.get(pos..pos + needle.len()) else {
        return false;
    };
    if match_case {
        window == needle
    } else {
        window.eq_ignore_ascii_case(needle)
    }
}
