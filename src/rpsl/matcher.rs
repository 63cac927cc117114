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
//! Rule matcher — C9. Walks an aut-num's `import`/`export` rules in file
//! order. Within one rule, the first factor whose subject covers the
//! observed neighbour decides that rule's outcome; across the whole list,
//! a `0` from any rule short-circuits the walk, and otherwise the largest
//! filter code seen across every rule whose subject matched is the
//! residual.

use std::collections::HashSet;

use irrcheck_utils::Prefix;

use super::directory::HashDirectory;
use super::filter::{self, Dirs};
use super::objects::{AutNumRule, PeeringSetObject};

/// Bundle of directories a subject/filter resolution may need.
pub struct MatchDirs<'a> {
    pub filter: Dirs<'a>,
    pub peeringset: &'a HashDirectory<PeeringSetObject>,
}

/// Result of walking a rule set against one neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No factor's subject covered the neighbour ASN — the ruleset is
    /// silent on this neighbour.
    NoRuleApplies,
    /// A factor matched; its filter evaluated to the given C8 code.
    Matched(i32),
}

/// Walks `rules` (an aut-num's `import`, `export`, `mp-import` or
/// `mp-export` list, or a chain of several) against `neighbour_asn`. A rule
/// whose first covering factor evaluates to `CODE_OK` ends the walk
/// immediately. Otherwise every rule whose subject covers the neighbour
/// contributes its filter code, and the largest of those is the residual
/// reported once the whole list has been walked.
///
/// IPv6 lookups only consider multi-protocol rules (`mp-*`); a rule whose
/// AFI does not admit `is_ipv6` is skipped entirely.
pub fn match_rules<'a>(
    rules: impl IntoIterator<Item = &'a AutNumRule>,
    neighbour_asn: &str,
    prefix: &Prefix,
    as_path: &[String],
    dirs: &MatchDirs,
    is_ipv6: bool,
) -> MatchOutcome {
    let mut residual: Option<i32> = None;
    for rule in rules {
        if is_ipv6 && !rule.multi_protocol {
            continue;
        }
        if !rule.parsed.afi.admits(is_ipv6) {
            continue;
        }
        for factor in &rule.parsed.factors {
            if subject_matches(&factor.subject, neighbour_asn, dirs) {
                let code = filter::match_filter(&factor.filter_text, prefix, as_path, &dirs.filter, is_ipv6);
                if code == filter::CODE_OK {
                    return MatchOutcome::Matched(filter::CODE_OK);
                }
                residual = Some(residual.map_or(code, |r| r.max(code)));
                break;
            }
        }
    }
    match residual {
        Some(code) => MatchOutcome::Matched(code),
        None => MatchOutcome::NoRuleApplies,
    }
}

fn subject_matches(subject: &str, neighbour_asn: &str, dirs: &MatchDirs) -> bool {
    let upper = subject.to_ascii_uppercase();

    if upper == "ANY" {
        return true;
    }
    if filter::norm_asn(&upper) == filter::norm_asn(neighbour_asn) {
        return true;
    }
    if upper.contains("AS-") {
        let mut visited = HashSet::new();
        return matches!(
            filter::as_set_contains_pub(dirs.filter.asset, &upper, neighbour_asn, &mut visited),
            Some(true)
        );
    }
    if let Some(peering) = dirs.peeringset.get(&upper) {
        return filter::peering_set_contains(&peering.peering, neighbour_asn)
            || filter::peering_set_contains(&peering.mp_peering, neighbour_asn);
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpsl::objects::{AsSetObject, FilterSetObject, RouteSetObject};
    use crate::rpsl::parse::parse_ripe_file;
    use crate::rpsl::objects::AutNumObject;

    fn dirs<'a>(
        asset: &'a HashDirectory<AsSetObject>,
        filterset: &'a HashDirectory<FilterSetObject>,
        routeset: &'a HashDirectory<RouteSetObject>,
        peeringset: &'a HashDirectory<PeeringSetObject>,
    ) -> MatchDirs<'a> {
        MatchDirs {
            filter: Dirs { asset, filterset, routeset },
            peeringset,
        }
    }

    #[test]
    fn first_matching_factor_wins() {
        let text = "aut-num: AS1\nimport: from AS2 accept ANY\nimport: from AS3 accept AS3\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset = HashDirectory::new();
        let d = dirs(&asset, &filterset, &routeset, &peeringset);

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let path = vec!["3".to_string()];
        let outcome = match_rules(&an.import, "AS3", &prefix, &path, &d, false);
        assert_eq!(outcome, MatchOutcome::Matched(filter::CODE_OK));
    }

    #[test]
    fn unmatched_neighbour_is_silent() {
        let text = "aut-num: AS1\nimport: from AS2 accept ANY\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset = HashDirectory::new();
        let d = dirs(&asset, &filterset, &routeset, &peeringset);

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let path = vec!["9".to_string()];
        let outcome = match_rules(&an.import, "AS9", &prefix, &path, &d, false);
        assert_eq!(outcome, MatchOutcome::NoRuleApplies);
    }

    /// A later rule yielding `0` must win even when an earlier rule for the
    /// same neighbour already produced a non-zero residual.
    #[test]
    fn later_zero_rule_short_circuits() {
        let text = "aut-num: AS1\nimport: from AS3 accept AS5\nimport: from AS3 accept ANY\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset = HashDirectory::new();
        let d = dirs(&asset, &filterset, &routeset, &peeringset);

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let path = vec!["3".to_string(), "4".to_string()];
        let outcome = match_rules(&an.import, "AS3", &prefix, &path, &d, false);
        assert_eq!(outcome, MatchOutcome::Matched(filter::CODE_OK));
    }

    /// With no rule yielding `0`, the residual is the largest code seen
    /// across every rule whose subject covered the neighbour, not the
    /// first one encountered.
    #[test]
    fn residual_is_the_maximum_across_rules() {
        let text = "aut-num: AS1\nimport: from AS3 accept AS5\nimport: from AS3 accept AS-UNDEFINED\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset = HashDirectory::new();
        let d = dirs(&asset, &filterset, &routeset, &peeringset);

        let prefix = Prefix::parse("192.0.2.0/24", false).unwrap();
        let path = vec!["3".to_string(), "4".to_string()];
        let outcome = match_rules(&an.import, "AS3", &prefix, &path, &d, false);
        assert_eq!(outcome, MatchOutcome::Matched(filter::CODE_AS_SET_UNDEF));
    }

    #[test]
    fn ipv6_skips_non_mp_rules() {
        let text = "aut-num: AS1\nimport: from AS2 accept ANY\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();

        let asset = HashDirectory::new();
        let filterset = HashDirectory::new();
        let routeset = HashDirectory::new();
        let peeringset = HashDirectory::new();
        let d = dirs(&asset, &filterset, &routeset, &peeringset);

        let prefix = Prefix::parse("2001:db8::/32", true).unwrap();
        let path = vec!["2".to_string()];
        let outcome = match_rules(&an.import, "AS2", &prefix, &path, &d, true);
        assert_eq!(outcome, MatchOutcome::NoRuleApplies);
    }
}
