//! Validated IPv4 address literals.
//!
//! An [`Address`] only exists once a candidate string has passed octet range
//! validation, so everything downstream (classification, dedup, storage) can
//! treat it as a well-formed IPv4 address.
use std::fmt;
use std::net::Ipv4Addr;

/// A validated IPv4 address in canonical dotted-decimal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Ipv4Addr);

impl Address {
    /// Parse a candidate such as `"192.168.1.10"`. Returns `None` unless the
    /// string is exactly four dot-separated decimal octets in `0..=255`,
    /// written without leading zeros.
    pub fn parse(candidate: &str) -> Option<Self> {
        candidate.parse::<Ipv4Addr>().ok().map(Self)
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
