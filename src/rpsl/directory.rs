// IRRCHECK: BGP route-origin and route-policy auditing against the RIPE IRR
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Object directories — C6. `RouteDirectory` is dual-indexed (a C2 trie for
//! prefix lookups, a hash map from origin ASN for the timeline report's
//! candidate enumeration); `HashDirectory<T>` is the generic name-keyed
//! store for aut-num/as-set/filter-set/route-set/peering-set.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use irrcheck_utils::{Prefix, PrefixTrie};

use super::objects::{AsSetObject, AutNumObject, FilterSetObject, PeeringSetObject, RouteObject, RouteSetObject};

/// Directories are keyed by the object's natural RPSL key, upper-cased.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for AutNumObject {
    fn key(&self) -> &str {
        &self.asn
    }
}
impl Keyed for AsSetObject {
    fn key(&self) -> &str {
        &self.name
    }
}
impl Keyed for FilterSetObject {
    fn key(&self) -> &str {
        &self.name
    }
}
impl Keyed for RouteSetObject {
    fn key(&self) -> &str {
        &self.name
    }
}
impl Keyed for PeeringSetObject {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashDirectory<T> {
    by_name: HashMap<String, T>,
}

impl<T> Default for HashDirectory<T> {
    fn default() -> Self {
        HashDirectory {
            by_name: HashMap::new(),
        }
    }
}

impl<T: Keyed> HashDirectory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, obj: T) {
        let key = obj.key().to_ascii_uppercase();
        self.by_name.insert(key, obj);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(&name.to_ascii_uppercase())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.by_name.get_mut(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_name.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.by_name.values_mut()
    }
}

/// Dual-indexed route directory: a prefix trie for longest/exact-prefix
/// lookup, plus an origin→objects hash so the timeline report can enumerate
/// every route object that exists for an ASN regardless of prefix — needed
/// for mismatch-candidate enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDirectory {
    // Payload is a `Vec` because the same prefix may carry multiple route
    // objects with distinct origins; a trie node's terminal slot holds
    // exactly one payload, so duplicates at one prefix must be accumulated
    // rather than overwriting each other.
    trie: PrefixTrie<Vec<Arc<RouteObject>>>,
    by_origin: HashMap<String, Vec<Arc<RouteObject>>>,
    is_ipv6: bool,
}

impl RouteDirectory {
    pub fn new(is_ipv6: bool) -> Self {
        RouteDirectory {
            trie: PrefixTrie::new(is_ipv6),
            by_origin: HashMap::new(),
            is_ipv6,
        }
    }

    pub fn is_ipv6(&self) -> bool {
        self.is_ipv6
    }

    pub fn insert(&mut self, route: RouteObject) {
        let obj = Arc::new(route);
        let prefix = obj.prefix;
        match self.trie.lookup_net_exact(&prefix).into_iter().next() {
            Some((_, mut objs)) => {
                objs.push(obj.clone());
                self.trie.insert(prefix, objs);
            }
            None => self.trie.insert(prefix, vec![obj.clone()]),
        }
        self.by_origin
            .entry(obj.origin.clone())
            .or_default()
            .push(obj);
    }

    /// Exact-prefix lookup — every route object whose prefix equals `net`.
    pub fn get_route_objs(&self, net: &Prefix) -> Vec<Arc<RouteObject>> {
        self.trie
            .lookup_net_exact(net)
            .into_iter()
            .flat_map(|(_, objs)| objs)
            .collect()
    }

    pub fn by_origin(&self, asn: &str) -> &[Arc<RouteObject>] {
        self.by_origin
            .get(&asn.to_ascii_uppercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }
}

/// Member-of enrichment: a single-threaded pass, after per-file parsing
/// completes, that pushes each aut-num's/route-object's `member-of`
/// back-references into the target set's member list. Directories are
/// treated as immutable afterwards.
pub fn enrich_member_of(
    asset_dir: &mut HashDirectory<AsSetObject>,
    routeset_dir: &mut HashDirectory<RouteSetObject>,
    autnums: &HashDirectory<AutNumObject>,
    route4: &RouteDirectory,
    route6: &RouteDirectory,
) {
    for autnum in autnums.iter() {
        for set_name in &autnum.member_of {
            if let Some(set) = asset_dir.get_mut(set_name) {
                if !set.members.contains(&autnum.asn) {
                    set.members.push(autnum.asn.clone());
                }
            }
        }
    }

    for dir in [route4, route6] {
        for route in dir.trie_iter() {
            for set_name in &route.member_of {
                if let Some(set) = routeset_dir.get_mut(set_name) {
                    let text = route.prefix.to_canonical_string();
                    let target = if route.prefix.is_ipv6() {
                        &mut set.mp_members
                    } else {
                        &mut set.members
                    };
                    if !target.contains(&text) {
                        target.push(text);
                    }
                }
            }
        }
    }
}

impl RouteDirectory {
    /// All route objects, for the member-of enrichment pass.
    pub fn trie_iter(&self) -> impl Iterator<Item = Arc<RouteObject>> + '_ {
        self.by_origin.values().flatten().cloned()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use irrcheck_utils::Prefix;

    #[test]
    fn exact_lookup_returns_multiple_origins() {
        let mut dir = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();
        dir.insert(RouteObject {
            prefix: p,
            origin: "AS8400".to_string(),
            member_of: vec![],
        });
        dir.insert(RouteObject {
            prefix: p,
            origin: "AS9999".to_string(),
            member_of: vec![],
        });
        let objs = dir.get_route_objs(&p);
        assert_eq!(objs.len(), 2);
    }

    #[test]
    fn by_origin_index() {
        let mut dir = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();
        dir.insert(RouteObject {
            prefix: p,
            origin: "AS8400".to_string(),
            member_of: vec![],
        });
        assert_eq!(dir.by_origin("as8400").len(), 1);
    }
}
