//! Pinning Verifier
//!
//! Compares what a TLS connection presented against the certificate and IP
//! addresses pinned for the document's domain. A match lets the caller
//! proceed past a TLS anomaly silently; anything else is surfaced through
//! the normal error path. The verifier only reads pins.

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Certificate
// =============================================================================

/// Identity fields of a TLS certificate, as observed or as pinned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub issued_to_cname: String,
    pub issued_to_org: String,
    pub issued_to_unit: String,
    pub issued_by_cname: String,
    pub issued_by_org: String,
    pub issued_by_unit: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// A pinned certificate carries the same fields as an observed one.
pub type PinnedCertificate = CertificateInfo;

/// Pinned values of one domain record. Written only by domain management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub certificate: Option<PinnedCertificate>,
    pub ip_addresses: Option<BTreeSet<IpAddr>>,
}

impl Pins {
    /// An empty pinned IP set counts as no IP pin.
    fn ip_pin(&self) -> Option<&BTreeSet<IpAddr>> {
        self.ip_addresses.as_ref().filter(|ips| !ips.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.certificate.is_none() && self.ip_pin().is_none()
    }
}

// =============================================================================
// Verifier
// =============================================================================

/// How an observed IP set is compared with a pinned one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpMatchMode {
    /// Observed set must equal the pinned set
    #[default]
    Exact,
    /// Observed set must share at least one address with the pinned set
    Overlap,
}

/// Which pinned values disagreed with the observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PinMismatch {
    pub certificate: bool,
    pub ip_addresses: bool,
}

/// Outcome of checking an observation against a domain's pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinCheck {
    /// The domain pins nothing; fall through to interactive handling.
    NothingPinned,
    /// Every pinned value matched.
    Matched,
    Mismatch(PinMismatch),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PinningVerifier {
    ip_match: IpMatchMode,
}

impl PinningVerifier {
    pub fn new(ip_match: IpMatchMode) -> Self {
        Self { ip_match }
    }

    pub fn ip_match(&self) -> IpMatchMode {
        self.ip_match
    }

    /// Check an observation against `pins`.
    ///
    /// Missing observed data never matches a pinned value.
    pub fn verify(
        &self,
        observed_cert: Option<&CertificateInfo>,
        observed_ips: Option<&BTreeSet<IpAddr>>,
        pins: &Pins,
    ) -> PinCheck {
        if pins.is_empty() {
            return PinCheck::NothingPinned;
        }

        let mismatch = PinMismatch {
            certificate: pins
                .certificate
                .as_ref()
                .is_some_and(|pinned| observed_cert != Some(pinned)),
            ip_addresses: pins
                .ip_pin()
                .is_some_and(|pinned| !observed_ips.is_some_and(|seen| self.ips_match(seen, pinned))),
        };

        if mismatch.certificate || mismatch.ip_addresses {
            PinCheck::Mismatch(mismatch)
        } else {
            PinCheck::Matched
        }
    }

    /// True only when something is pinned and all of it matched.
    pub fn matches_pinned(
        &self,
        observed_cert: Option<&CertificateInfo>,
        observed_ips: Option<&BTreeSet<IpAddr>>,
        pins: &Pins,
    ) -> bool {
        self.verify(observed_cert, observed_ips, pins) == PinCheck::Matched
    }

    fn ips_match(&self, seen: &BTreeSet<IpAddr>, pinned: &BTreeSet<IpAddr>) -> bool {
        match self.ip_match {
            IpMatchMode::Exact => seen == pinned,
            IpMatchMode::Overlap => !seen.is_disjoint(pinned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cert() -> CertificateInfo {
        CertificateInfo {
            issued_to_cname: "bank.example".into(),
            issued_to_org: "Bank".into(),
            issued_to_unit: "Web".into(),
            issued_by_cname: "Example CA".into(),
            issued_by_org: "Example Trust".into(),
            issued_by_unit: "Issuing".into(),
            not_before: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ips(list: &[&str]) -> BTreeSet<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_nothing_pinned() {
        let verifier = PinningVerifier::default();
        let pins = Pins::default();
        assert_eq!(verifier.verify(Some(&cert()), None, &pins), PinCheck::NothingPinned);
        assert!(!verifier.matches_pinned(Some(&cert()), None, &pins));

        let empty_ip_pin = Pins { certificate: None, ip_addresses: Some(BTreeSet::new()) };
        assert_eq!(verifier.verify(None, None, &empty_ip_pin), PinCheck::NothingPinned);
    }

    #[test]
    fn test_certificate_match_and_each_field_mismatch() {
        let verifier = PinningVerifier::default();
        let pins = Pins { certificate: Some(cert()), ip_addresses: None };
        assert!(verifier.matches_pinned(Some(&cert()), None, &pins));

        let later = Utc.with_ymd_and_hms(2028, 1, 1, 0, 0, 0).unwrap();
        let mutations: [fn(&mut CertificateInfo, DateTime<Utc>); 8] = [
            |c, _| c.issued_to_cname.push('x'),
            |c, _| c.issued_to_org.push('x'),
            |c, _| c.issued_to_unit.push('x'),
            |c, _| c.issued_by_cname.push('x'),
            |c, _| c.issued_by_org.push('x'),
            |c, _| c.issued_by_unit.push('x'),
            |c, d| c.not_before = d,
            |c, d| c.not_after = d,
        ];
        for (i, mutate) in mutations.iter().enumerate() {
            let mut observed = cert();
            mutate(&mut observed, later);
            assert_eq!(
                verifier.verify(Some(&observed), None, &pins),
                PinCheck::Mismatch(PinMismatch { certificate: true, ip_addresses: false }),
                "field {i} should break the match"
            );
        }

        // No certificate observed at all
        assert!(!verifier.matches_pinned(None, None, &pins));
    }

    #[test]
    fn test_ip_exact_and_overlap() {
        let pins = Pins { certificate: None, ip_addresses: Some(ips(&["192.0.2.1", "192.0.2.2"])) };

        let exact = PinningVerifier::new(IpMatchMode::Exact);
        assert!(exact.matches_pinned(None, Some(&ips(&["192.0.2.2", "192.0.2.1"])), &pins));
        assert!(!exact.matches_pinned(None, Some(&ips(&["192.0.2.1"])), &pins));
        assert!(!exact.matches_pinned(None, None, &pins));

        let overlap = PinningVerifier::new(IpMatchMode::Overlap);
        assert!(overlap.matches_pinned(None, Some(&ips(&["192.0.2.1", "2001:db8::1"])), &pins));
        assert!(!overlap.matches_pinned(None, Some(&ips(&["198.51.100.7"])), &pins));
    }

    #[test]
    fn test_both_pins_report_both_mismatches() {
        let verifier = PinningVerifier::default();
        let pins = Pins { certificate: Some(cert()), ip_addresses: Some(ips(&["192.0.2.1"])) };
        assert!(verifier.matches_pinned(Some(&cert()), Some(&ips(&["192.0.2.1"])), &pins));
        assert_eq!(
            verifier.verify(None, Some(&ips(&["192.0.2.9"])), &pins),
            PinCheck::Mismatch(PinMismatch { certificate: true, ip_addresses: true })
        );
    }
}
