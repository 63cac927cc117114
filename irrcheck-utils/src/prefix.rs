//! IP prefix parsing, classful-mask inference and canonical normalisation.
//!
//! This is the address model the rest of the toolchain builds on: a `Prefix`
//! is a `(network address, prefix length)` pair with host bits forced to
//! zero, tagged by address family. Textual input is accepted in the trimmed
//! "classful" notation BGP/IRR dumps use (`192.168.1/24`, `192.168.1.0`) as
//! well as plain CIDR (`192.168.1.0/24`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("empty prefix text")]
    Empty,
    #[error("invalid prefix syntax: {0:?}")]
    Syntax(String),
    #[error("can not resolve classful mask for class D/E address (first octet {0} >= 224)")]
    ClassfulOverflow(u8),
}

/// A normalised `(address, length)` pair. Host bits below `len` are always
/// zero; this is enforced at construction time via `IpNet::trunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prefix(IpNet);

impl Prefix {
    pub fn from_net(net: IpNet) -> Self {
        Prefix(net.trunc())
    }

    pub fn v4(addr: Ipv4Addr, len: u8) -> Self {
        Prefix(IpNet::V4(ipnet::Ipv4Net::new(addr, len).expect("valid v4 len").trunc()))
    }

    pub fn v6(addr: Ipv6Addr, len: u8) -> Self {
        Prefix(IpNet::V6(ipnet::Ipv6Net::new(addr, len).expect("valid v6 len").trunc()))
    }

    /// Parses one prefix, applying classful-mask inference to bare IPv4
    /// addresses/truncated octet groups that carry no explicit `/len`.
    /// IPv6 text must always carry an explicit length.
    pub fn parse(text: &str, is_ipv6: bool) -> Result<Self, PrefixError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrefixError::Empty);
        }
        if is_ipv6 {
            let net: IpNet = text
                .parse()
                .map_err(|_| PrefixError::Syntax(text.to_string()))?;
            return Ok(Prefix(net.trunc()));
        }
        normalize_ipv4_classful(text)
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.0, IpNet::V6(_))
    }

    pub fn len(&self) -> u8 {
        self.0.prefix_len()
    }

    pub fn addr(&self) -> IpAddr {
        self.0.addr()
    }

    pub fn net(&self) -> IpNet {
        self.0
    }

    /// `self` is the more specific (or equal) prefix contained within `other`.
    pub fn is_subset_of(&self, other: &Prefix) -> bool {
        self.is_ipv6() == other.is_ipv6() && other.0.contains(&self.0)
    }

    /// Big-endian bit sequence of the network address, truncated to `len()`
    /// bits — the representation the trie walks.
    pub fn bits(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(self.len() as usize);
        match self.0 {
            IpNet::V4(n) => {
                for byte in n.addr().octets() {
                    push_byte_bits(byte, &mut out);
                }
            }
            IpNet::V6(n) => {
                for byte in n.addr().octets() {
                    push_byte_bits(byte, &mut out);
                }
            }
        }
        out.truncate(self.len() as usize);
        out
    }

    pub fn to_canonical_string(&self) -> String {
        format!("{}/{}", self.0.addr(), self.0.prefix_len())
    }
}

fn push_byte_bits(byte: u8, out: &mut Vec<bool>) {
    for i in (0..8).rev() {
        out.push((byte & (1 << i)) != 0);
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_ipv6 = s.contains(':');
        Prefix::parse(s, is_ipv6)
    }
}

/// Implements the classful-mask-inference contract: a bare address missing
/// its `/len` is assigned `/8`, `/16` or `/24` from its first octet, and
/// truncated octet groups (`10`, `10.1`, `10.1.2`) are zero-padded on the
/// right before the mask is applied. First octet `>= 224` has no classful
/// mask and is rejected.
pub fn normalize_ipv4_classful(pfx: &str) -> Result<Prefix, PrefixError> {
    let (addr_part, explicit_len) = match pfx.split_once('/') {
        Some((a, l)) => (
            a,
            Some(
                l.parse::<u8>()
                    .map_err(|_| PrefixError::Syntax(pfx.to_string()))?,
            ),
        ),
        None => (pfx, None),
    };

    let addr = normalize_addr_octets(addr_part)?;
    let len = match explicit_len {
        Some(l) => l,
        None => resolve_classful_mask(&addr)?,
    };

    let net = ipnet::Ipv4Net::new(addr, len).map_err(|_| PrefixError::Syntax(pfx.to_string()))?;
    Ok(Prefix(IpNet::V4(net.trunc())))
}

fn normalize_addr_octets(addr: &str) -> Result<Ipv4Addr, PrefixError> {
    let mut octets = [0u8; 4];
    let parts: Vec<&str> = addr.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return Err(PrefixError::Syntax(addr.to_string()));
    }
    for (i, p) in parts.iter().enumerate() {
        octets[i] = p
            .parse::<u8>()
            .map_err(|_| PrefixError::Syntax(addr.to_string()))?;
    }
    Ok(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
}

fn resolve_classful_mask(addr: &Ipv4Addr) -> Result<u8, PrefixError> {
    let f = addr.octets()[0];
    if f >= 224 {
        return Err(PrefixError::ClassfulOverflow(f));
    }
    if f <= 127 {
        Ok(8)
    } else if f <= 191 {
        Ok(16)
    } else {
        Ok(24)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classful_inference() {
        assert_eq!(
            normalize_ipv4_classful("10.1.2").unwrap().to_canonical_string(),
            "10.0.0.0/8"
        );
        assert_eq!(
            normalize_ipv4_classful("130.0").unwrap().to_canonical_string(),
            "130.0.0.0/16"
        );
        assert_eq!(
            normalize_ipv4_classful("200.1.2").unwrap().to_canonical_string(),
            "200.1.2.0/24"
        );
        assert!(normalize_ipv4_classful("224.0.0.0").is_err());
    }

    #[test]
    fn explicit_len_bypasses_classful() {
        assert_eq!(
            normalize_ipv4_classful("192.168.1/24").unwrap().to_canonical_string(),
            "192.168.1.0/24"
        );
    }

    #[test]
    fn normalize_idempotent() {
        let p = normalize_ipv4_classful("2.10.0.0/16").unwrap();
        let p2 = Prefix::parse(&p.to_canonical_string(), false).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn subset_relation() {
        let outer = Prefix::parse("10.0.0.0/8", false).unwrap();
        let inner = Prefix::parse("10.1.2.0/24", false).unwrap();
        assert!(inner.is_subset_of(&outer));
        assert!(!outer.is_subset_of(&inner));
    }

    #[test]
    fn bits_truncated_to_len() {
        let p = Prefix::parse("128.0.0.0/1", false).unwrap();
        assert_eq!(p.bits(), vec![true]);
    }
}
