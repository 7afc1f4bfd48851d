//! CIDR range matching
//!
//! Ranges are parsed once at policy load; a malformed range is a
//! configuration error at startup, never a surprise at match time.

use crate::errors::{KeyGateError, Result};
use ipnet::IpNet;
use std::net::IpAddr;

/// A compiled set of CIDR ranges for one identity.
#[derive(Debug, Clone)]
pub struct CidrMatcher {
    ranges: Vec<IpNet>,
}

impl CidrMatcher {
    /// Parse a list of CIDR strings. Bare addresses like `10.1.2.3` are
    /// accepted as /32 (or /128) host routes.
    pub fn parse(ranges: &[String]) -> Result<Self> {
        let mut parsed = Vec::with_capacity(ranges.len());
        for range in ranges {
            let net = range
                .parse::<IpNet>()
                .or_else(|_| range.parse::<IpAddr>().map(IpNet::from))
                .map_err(|e| KeyGateError::InvalidCidr {
                    range: range.clone(),
                    reason: e.to_string(),
                })?;
            parsed.push(net);
        }
        Ok(Self { ranges: parsed })
    }

    /// True iff `addr` falls inside at least one range. An empty range set
    /// matches nothing.
    pub fn matches(&self, addr: IpAddr) -> bool {
        self.ranges.iter().any(|net| net.contains(&addr))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_match_inside_range() {
        let matcher = CidrMatcher::parse(&["10.0.0.0/8".to_string()]).unwrap();
        assert!(matcher.matches(addr("10.1.2.3")));
        assert!(!matcher.matches(addr("192.168.1.1")));
    }

    #[test]
    fn test_any_of_multiple_ranges() {
        let matcher = CidrMatcher::parse(&[
            "10.0.0.0/8".to_string(),
            "192.168.0.0/16".to_string(),
        ])
        .unwrap();
        assert!(matcher.matches(addr("192.168.4.5")));
        assert!(matcher.matches(addr("10.255.0.1")));
        assert!(!matcher.matches(addr("172.16.0.1")));
    }

    #[test]
    fn test_bare_address_as_host_route() {
        let matcher = CidrMatcher::parse(&["10.1.2.3".to_string()]).unwrap();
        assert!(matcher.matches(addr("10.1.2.3")));
        assert!(!matcher.matches(addr("10.1.2.4")));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let matcher = CidrMatcher::parse(&[]).unwrap();
        assert!(!matcher.matches(addr("127.0.0.1")));
        assert!(matcher.is_empty());
    }

    #[test]
    fn test_malformed_range_is_config_error() {
        let result = CidrMatcher::parse(&["10.0.0.0/33".to_string()]);
        assert!(matches!(result, Err(KeyGateError::InvalidCidr { .. })));

        let result = CidrMatcher::parse(&["not-a-cidr".to_string()]);
        assert!(matches!(result, Err(KeyGateError::InvalidCidr { .. })));
    }

    #[test]
    fn test_ipv6_range() {
        let matcher = CidrMatcher::parse(&["fd00::/8".to_string()]).unwrap();
        assert!(matcher.matches(addr("fd12::1")));
        assert!(!matcher.matches(addr("2001:db8::1")));
    }
}
