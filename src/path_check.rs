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
//! Path checker — C11. Walks each observed AS-path hop by hop, resolving the
//! relevant `aut-num` and its import/export rules. Hop outcomes use a dense
//! `3xx`/`4xx` residual-preserving taxonomy rather than collapsing every
//! filter failure to a single value, so a caller can tell which specific
//! check failed at each hop.

use irrcheck_utils::Prefix;

use crate::bgp_table::{normalize_as_path, PathVector};
use crate::rpsl::{match_rules, HashDirectory, MatchDirs, MatchOutcome};
use crate::rpsl::objects::AutNumObject;

/// Hop outcome codes. `300`/`400` mean "no rule at all applied";
/// `3xx`/`4xx` otherwise carry `300/400 + residual_filter_code`.
pub const HOP_OK: i32 = 0;
pub const HOP_UNCHECKABLE: i32 = 1;
pub const HOP_OUTSIDE_REGION: i32 = 2;
pub const HOP_IMPORT_NO_RULE: i32 = 300;
pub const HOP_EXPORT_NO_RULE: i32 = 400;

/// One `(asn, hop_code)` entry of a path check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResult {
    pub asn: String,
    pub code: i32,
}

/// `(path_vector, fully_in_region, per_hop)` — a path-check verdict.
#[derive(Debug, Clone)]
pub struct PathCheckResult {
    pub as_path: String,
    pub fully_in_region: bool,
    pub per_hop: Vec<HopResult>,
}

/// Bundle of directories a path check needs, scoped to one address family.
pub struct PathCheckDirs<'a> {
    pub autnum: &'a HashDirectory<AutNumObject>,
    pub matcher: &'a MatchDirs<'a>,
}

/// Walks `as_path` hop by hop. `observer_asn` supplies the
/// `next_as` for the path's leftmost (nearest-to-observer) hop when
/// configured; `None` leaves that hop's export check uncheckable-satisfied
/// only by prepending, never by a configured observer identity.
pub fn check_path(
    pv: &PathVector,
    prefix: &Prefix,
    dirs: &PathCheckDirs,
    is_ipv6: bool,
    observer_asn: Option<&str>,
) -> PathCheckResult {
    let tokens = normalize_as_path(&pv.as_path);
    let mut per_hop = Vec::with_capacity(tokens.len());
    let mut fully_in_region = true;

    for (i, asn) in tokens.iter().enumerate() {
        if asn.starts_with('{') {
            per_hop.push(HopResult { asn: asn.clone(), code: HOP_UNCHECKABLE });
            continue;
        }

        // previous_as: the AS that, in on-wire order, announced to `asn` —
        // one step closer to the origin. The originator has no previous.
        let previous_as: Option<&str> = tokens.get(i + 1).map(|s| s.as_str());
        // next_as: the AS `asn` announces onward to — one step closer to
        // the observer. The nearest-to-observer hop falls back to the
        // configured observer ASN, else is unresolvable.
        let next_as: Option<&str> = if i > 0 {
            Some(tokens[i - 1].as_str())
        } else {
            observer_asn
        };

        let code = check_hop(asn, i, previous_as, next_as, prefix, &tokens, dirs, is_ipv6);
        if code == HOP_OUTSIDE_REGION {
            fully_in_region = false;
        }
        per_hop.push(HopResult { asn: asn.clone(), code });
    }

    PathCheckResult {
        as_path: pv.as_path.clone(),
        fully_in_region,
        per_hop,
    }
}

/// One hop's import/export evaluation. The `as_path` slice
/// handed to the C8/C9 evaluators must always start at the neighbour being
/// filtered and end at the origin — that is what lets `PEERAS` (`as_path[0]`)
/// and the origin check (`as_path[-1]`) resolve correctly regardless of
/// which side (import/export) is being evaluated.
fn check_hop(
    asn: &str,
    i: usize,
    previous_as: Option<&str>,
    next_as: Option<&str>,
    prefix: &Prefix,
    tokens: &[String],
    dirs: &PathCheckDirs,
    is_ipv6: bool,
) -> i32 {
    let Some(autnum) = dirs.autnum.get(asn_key(asn).as_str()) else {
        return HOP_OUTSIDE_REGION;
    };

    match previous_as {
        None => {}
        Some(p) if norm_asn_eq(p, asn) => {}
        Some(p) => {
            // neighbour = previous_as; path from neighbour to origin is
            // tokens[i+1..] (previous_as is itself tokens[i+1]).
            let path = &tokens[i + 1..];
            match resolve_side(&autnum.import, &autnum.mp_import, p, prefix, path, dirs, is_ipv6) {
                Some(0) => {}
                Some(residual) => return 300 + residual,
                None => return HOP_IMPORT_NO_RULE,
            }
        }
    }

    match next_as {
        None => HOP_OK,
        Some(n) if norm_asn_eq(n, asn) => HOP_OK,
        Some(n) => {
            // neighbour = next_as. When next_as is tokens[i - 1] it already
            // heads the path-to-origin slice (tokens[i-1..]); when it is the
            // observer's configured ASN (not itself a path element) it is
            // prepended to tokens[i..].
            let owned;
            let path: &[String] = if i > 0 {
                &tokens[i - 1..]
            } else {
                let mut v = Vec::with_capacity(tokens.len() - i + 1);
                v.push(n.to_string());
                v.extend_from_slice(&tokens[i..]);
                owned = v;
                &owned
            };
            match resolve_side(&autnum.export, &autnum.mp_export, n, prefix, path, dirs, is_ipv6) {
                Some(0) => HOP_OK,
                Some(residual) => 400 + residual,
                None => HOP_EXPORT_NO_RULE,
            }
        }
    }
}

/// Walks the plain rule list and the multi-protocol list as one combined
/// pass against `neighbour`: a `0` from any rule short-circuits to
/// `Some(0)`, otherwise `Some(residual)` carries the largest filter code
/// seen across every rule in either list whose subject covered the
/// neighbour. `None` means neither list had a rule that applied at all.
fn resolve_side(
    plain: &[crate::rpsl::AutNumRule],
    mp: &[crate::rpsl::AutNumRule],
    neighbour: &str,
    prefix: &Prefix,
    as_path: &[String],
    dirs: &PathCheckDirs,
    is_ipv6: bool,
) -> Option<i32> {
    match match_rules(plain.iter().chain(mp.iter()), neighbour, prefix, as_path, dirs.matcher, is_ipv6) {
        MatchOutcome::Matched(code) => Some(code),
        MatchOutcome::NoRuleApplies => None,
    }
}

fn asn_key(asn: &str) -> String {
    let upper = asn.trim().to_ascii_uppercase();
    match upper.strip_prefix("AS") {
        Some(rest) if rest.bytes().all(|b| b.is_ascii_digit()) => upper,
        _ => format!("AS{upper}"),
    }
}

fn norm_asn_eq(a: &str, b: &str) -> bool {
    let bare = |s: &str| -> String {
        let upper = s.trim().to_ascii_uppercase();
        upper.strip_prefix("AS").map(|r| r.to_string()).unwrap_or(upper)
    };
    bare(a) == bare(b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpsl::objects::{AsSetObject, AutNumRule, FilterSetObject, PeeringSetObject, RouteSetObject};
    use crate::rpsl::FilterDirs;

    fn pv(as_path: &str) -> PathVector {
        PathVector {
            status_flags: ">".to_string(),
            prefix: Some("192.0.2.0/24".to_string()),
            next_hop: None,
            as_path: as_path.to_string(),
        }
    }

    /// S5 prepending: `as_path[i] == as_path[i+1]` always satisfies import.
    #[test]
    fn prepending_satisfies_import() {
        let mut autnum_dir = HashDirectory::new();
        let mut an = AutNumObject { asn: "AS2".to_string(), ..Default::default() };
        an.import.push(AutNumRule::parse("from AS3 accept ANY", false, false).unwrap());
        autnum_dir.insert(an);

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset: HashDirectory<PeeringSetObject> = HashDirectory::new();
        let matcher = MatchDirs { filter: FilterDirs { asset: &asset, filterset: &filterset, routeset: &routeset }, peeringset: &peeringset };
        let dirs = PathCheckDirs { autnum: &autnum_dir, matcher: &matcher };

        // "2 2": the origin prepends itself once. Hop 0's previous_as and
        // hop 1 (the origin)'s next_as both equal the hop's own asn, so
        // neither side ever has to consult the (non-matching) import rule.
        let v = pv("2 2 i");
        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let res = check_path(&v, &prefix, &dirs, false, None);
        assert_eq!(res.per_hop.len(), 2);
        assert!(res.per_hop.iter().all(|h| h.code == HOP_OK));
    }

    /// S6 — path policy: import matches AS-CUSTOMERS, export announces AS2.
    #[test]
    fn s6_path_policy() {
        let mut autnum_dir = HashDirectory::new();
        let mut an = AutNumObject { asn: "AS2".to_string(), ..Default::default() };
        an.import.push(AutNumRule::parse("from AS1 accept AS-CUSTOMERS", false, false).unwrap());
        an.export.push(AutNumRule::parse("to AS3 announce AS-CUSTOMERS", false, false).unwrap());
        autnum_dir.insert(an);

        let mut asset = HashDirectory::new();
        asset.insert(AsSetObject { name: "AS-CUSTOMERS".to_string(), members: vec!["AS1".to_string()] });
        let filterset: HashDirectory<FilterSetObject> = HashDirectory::new();
        let routeset: HashDirectory<RouteSetObject> = HashDirectory::new();
        let peeringset: HashDirectory<PeeringSetObject> = HashDirectory::new();
        let matcher = MatchDirs { filter: FilterDirs { asset: &asset, filterset: &filterset, routeset: &routeset }, peeringset: &peeringset };
        let dirs = PathCheckDirs { autnum: &autnum_dir, matcher: &matcher };

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();

        let v = pv("3 2 1 i");
        let res = check_path(&v, &prefix, &dirs, false, None);
        let hop2 = res.per_hop.iter().find(|h| h.asn == "2").unwrap();
        assert_eq!(hop2.code, HOP_OK);

        // direct neighbour still AS1 (subject matches), but the path's
        // origin (AS9) is absent from AS-CUSTOMERS: import filter fails.
        let v2 = pv("3 2 1 9 i");
        let res2 = check_path(&v2, &prefix, &dirs, false, None);
        let hop2b = res2.per_hop.iter().find(|h| h.asn == "2").unwrap();
        assert!((301..=319).contains(&hop2b.code));
    }

    #[test]
    fn asn_outside_region_marks_not_fully_in_region() {
        let autnum_dir: HashDirectory<AutNumObject> = HashDirectory::new();
        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset: HashDirectory<PeeringSetObject> = HashDirectory::new();
        let matcher = MatchDirs { filter: FilterDirs { asset: &asset, filterset: &filterset, routeset: &routeset }, peeringset: &peeringset };
        let dirs = PathCheckDirs { autnum: &autnum_dir, matcher: &matcher };

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let v = pv("3 2 1 i");
        let res = check_path(&v, &prefix, &dirs, false, None);
        assert!(!res.fully_in_region);
        assert!(res.per_hop.iter().all(|h| h.code == HOP_OUTSIDE_REGION));
    }

    #[test]
    fn aggregate_hop_is_uncheckable() {
        let autnum_dir: HashDirectory<AutNumObject> = HashDirectory::new();
        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset: HashDirectory<PeeringSetObject> = HashDirectory::new();
        let matcher = MatchDirs { filter: FilterDirs { asset: &asset, filterset: &filterset, routeset: &routeset }, peeringset: &peeringset };
        let dirs = PathCheckDirs { autnum: &autnum_dir, matcher: &matcher };

        let prefix = Prefix::parse("9.9.0.0/16", false).unwrap();
        let v = pv("3356 {174 701} i");
        let res = check_path(&v, &prefix, &dirs, false, None);
        let agg_hop = res.per_hop.iter().find(|h| h.asn.starts_with('{')).unwrap();
        assert_eq!(agg_hop.code, HOP_UNCHECKABLE);
    }
}
