//! Pulls IPv4 literals out of free-form log lines.
//!
//! Extraction is two-phase: a regex finds anything shaped like a dotted quad,
//! then [`Address::parse`] drops candidates whose octets are out of range.
use std::sync::LazyLock;

use regex::Regex;

use crate::address::Address;

static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("candidate pattern is valid")
});

/// Return every dotted-quad shaped substring of `line`, in order. Octet values
/// are not checked here, so `"999.1.1.1"` is returned as a candidate.
pub fn extract(line: &str) -> Vec<&str> {
    CANDIDATE.find_iter(line).map(|m| m.as_str()).collect()
}

/// Return the valid addresses in `line` in order of appearance. Repeats within
/// the line are kept; deduplication is scoped to the whole scan.
pub fn extract_addresses(line: &str) -> Vec<Address> {
    CANDIDATE
        .find_iter(line)
        .filter_map(|m| Address::parse(m.as_str()))
        .collect()
}
