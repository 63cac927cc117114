//! Binary radix trie over IPv4/IPv6 prefixes, keyed on MSB-first address
//! bits. One trie instance is scoped to a single address family; mixing
//! families in the same trie is a caller error (debug-asserted).

use serde::{Deserialize, Serialize};

use crate::prefix::Prefix;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node<T> {
    zero: Option<Box<Node<T>>>,
    one: Option<Box<Node<T>>>,
    terminal: Option<(Prefix, T)>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Node {
            zero: None,
            one: None,
            terminal: None,
        }
    }
}

/// Longest-prefix-match trie. `T` is the caller-owned payload attached to
/// each inserted prefix (e.g. an origin ASN, an `(net, status, rir)` tuple).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixTrie<T> {
    root: Node<T>,
    ipv6: bool,
    len: usize,
}

impl<T: Clone> PrefixTrie<T> {
    pub fn new(ipv6: bool) -> Self {
        PrefixTrie {
            root: Node::default(),
            ipv6,
            len: 0,
        }
    }

    pub fn is_ipv6(&self) -> bool {
        self.ipv6
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walks the tree creating `zero`/`one` children as needed; at depth
    /// `net.len()` sets the terminal prefix and payload.
    pub fn insert(&mut self, net: Prefix, payload: T) {
        debug_assert_eq!(net.is_ipv6(), self.ipv6, "prefix family mismatch in trie");
        let bits = net.bits();
        let mut node = &mut self.root;
        for bit in bits {
            node = if bit {
                node.one.get_or_insert_with(|| Box::new(Node::default()))
            } else {
                node.zero.get_or_insert_with(|| Box::new(Node::default()))
            };
        }
        if node.terminal.is_none() {
            self.len += 1;
        }
        node.terminal = Some((net, payload));
    }

    /// Walks the bits of `ip` (itself a prefix — a bare address is `/32` or
    /// `/128`), collecting every covering terminal along the path.
    /// Candidates are returned least-specific first (depth-ascending, which
    /// falls out of the walk order for free). Stops once depth exceeds
    /// `ip`'s own length or once `max_matches` candidates are collected
    /// (`0` = unlimited).
    pub fn lookup_all_levels(&self, ip: &Prefix, max_matches: usize) -> Vec<(Prefix, T)> {
        let limit = ip.len() as usize;
        let bits = {
            // `Prefix::bits` truncates to the prefix's own length; for a
            // lookup key we want every bit down to `limit`, which for a
            // terminal prefix is exactly what `bits()` already returns.
            ip.bits()
        };

        let mut candidates = Vec::new();
        let mut node = &self.root;

        for (bi, bit) in bits.into_iter().enumerate() {
            if let Some((tpfx, payload)) = &node.terminal {
                if ip.is_subset_of(tpfx) || tpfx == ip {
                    candidates.push((*tpfx, payload.clone()));
                }
            }
            if bi >= limit || (max_matches > 0 && candidates.len() >= max_matches) {
                return candidates;
            }
            let next = if bit { &node.one } else { &node.zero };
            match next {
                Some(n) => node = n,
                None => return candidates,
            }
        }

        if let Some((tpfx, payload)) = &node.terminal {
            if ip.is_subset_of(tpfx) || tpfx == ip {
                candidates.push((*tpfx, payload.clone()));
            }
        }
        candidates
    }

    pub fn lookup_first(&self, ip: &Prefix) -> Option<(Prefix, T)> {
        self.lookup_all_levels(ip, 1).into_iter().next()
    }

    pub fn lookup_best(&self, ip: &Prefix) -> Option<(Prefix, T)> {
        self.lookup_all_levels(ip, 0).into_iter().last()
    }

    /// Exact-length match(es) at `net` — candidates whose terminal prefix
    /// length equals `net.len()` exactly (there is at most one, since a
    /// second `insert` at the same prefix overwrites the first, but route
    /// directories layer their own multi-value semantics on top of this).
    pub fn lookup_net_exact(&self, net: &Prefix) -> Vec<(Prefix, T)> {
        self.lookup_all_levels(net, 0)
            .into_iter()
            .filter(|(p, _)| p.len() == net.len())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exactness_and_best_match() {
        let mut t: PrefixTrie<&'static str> = PrefixTrie::new(false);
        let a = Prefix::parse("10.0.0.0/8", false).unwrap();
        let b = Prefix::parse("10.1.0.0/16", false).unwrap();
        let c = Prefix::parse("10.1.2.0/24", false).unwrap();
        t.insert(a, "a");
        t.insert(b, "b");
        t.insert(c, "c");

        let ip = Prefix::parse("10.1.2.5/32", false).unwrap();
        let best = t.lookup_best(&ip).unwrap();
        assert_eq!(best.1, "c");

        let first = t.lookup_first(&ip).unwrap();
        assert_eq!(first.1, "a");

        let exact = t.lookup_net_exact(&c);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].1, "c");
    }

    #[test]
    fn no_covering_prefix_is_empty() {
        let mut t: PrefixTrie<u32> = PrefixTrie::new(false);
        t.insert(Prefix::parse("192.0.2.0/24", false).unwrap(), 1);
        let ip = Prefix::parse("203.0.113.1/32", false).unwrap();
        assert!(t.lookup_all_levels(&ip, 0).is_empty());
        assert!(t.lookup_best(&ip).is_none());
    }

    #[test]
    fn all_levels_ordered_least_specific_first() {
        let mut t: PrefixTrie<u8> = PrefixTrie::new(false);
        t.insert(Prefix::parse("172.16.0.0/12", false).unwrap(), 1);
        t.insert(Prefix::parse("172.16.0.0/16", false).unwrap(), 2);
        t.insert(Prefix::parse("172.16.0.0/24", false).unwrap(), 3);
        let ip = Prefix::parse("172.16.0.1/32", false).unwrap();
        let all = t.lookup_all_levels(&ip, 0);
        let payloads: Vec<u8> = all.iter().map(|(_, p)| *p).collect();
        assert_eq!(payloads, vec![1, 2, 3]);
    }
}
