//! Private/public classification against the RFC 1918 blocks.
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Which collection an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Private,
    Public,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Private => "private",
            Classification::Public => "public",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFC 1918 private blocks as (network, prefix length), tested in order.
pub const PRIVATE_BLOCKS: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

pub static PRIVATE_RANGES: LazyLock<Vec<Ipv4Network>> = LazyLock::new(|| {
    PRIVATE_BLOCKS
        .iter()
        .filter_map(|&(network, prefix)| Ipv4Network::new(network, prefix).ok())
        .collect()
});

pub fn classify(addr: &Address) -> Classification {
    let ip = addr.ip();
    if PRIVATE_RANGES.iter().any(|net| net.contains(ip)) {
        Classification::Private
    } else {
        Classification::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(s: &str) -> Classification {
        classify(&Address::parse(s).unwrap())
    }

    #[test]
    fn private_blocks_and_their_edges() {
        for ip in [
            "10.0.0.0",
            "10.255.255.255",
            "172.16.0.0",
            "172.31.255.255",
            "192.168.0.0",
            "192.168.255.255",
            "192.168.1.10",
        ] {
            assert_eq!(class_of(ip), Classification::Private, "{ip}");
        }
    }

    #[test]
    fn everything_else_is_public() {
        for ip in [
            "8.8.8.8",
            "9.255.255.255",
            "11.0.0.0",
            "172.15.255.255",
            "172.32.0.0",
            "192.167.255.255",
            "192.169.0.0",
            "127.0.0.1",
            "0.0.0.0",
            "255.255.255.255",
        ] {
            assert_eq!(class_of(ip), Classification::Public, "{ip}");
        }
    }

    #[test]
    fn range_table_holds_every_block() {
        assert_eq!(PRIVATE_RANGES.len(), PRIVATE_BLOCKS.len());
        let prefixes: Vec<u8> = PRIVATE_RANGES.iter().map(|n| n.prefix()).collect();
        assert_eq!(prefixes, vec![8, 12, 16]);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(Classification::Private.to_string(), "private");
        assert_eq!(Classification::Public.as_str(), "public");
    }
}
