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
//! Route-object checker — C10. Classifies one best `PathVector` against the
//! IANA directory (C5) and the RIPE route directory (C6).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use irrcheck_utils::Prefix;

use crate::bgp_table::{normalize_as_path, PathVector};
use crate::iana::IanaDirectory;
use crate::rpsl::{RouteObject, RouteDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum RouteCheckCode {
    Ok = 0,
    Aggregate = 1,
    MissingOrigin = 2,
    AsMismatch = 3,
    NotFound = 4,
    NonRipe = 5,
}

impl RouteCheckCode {
    /// `%s: %d` legend text used in the per-day routes report.
    pub fn legend(self) -> &'static str {
        match self {
            RouteCheckCode::Ok => "OK",
            RouteCheckCode::Aggregate => "no-search aggregate",
            RouteCheckCode::MissingOrigin => "origin missing",
            RouteCheckCode::AsMismatch => "AS not match",
            RouteCheckCode::NotFound => "route obj not found",
            RouteCheckCode::NonRipe => "non-ripe",
        }
    }
}

/// `(prefix, as_path, matched_route_objects?, code)` — a route-check
/// verdict.
#[derive(Debug, Clone)]
pub struct RouteCheckResult {
    pub prefix: String,
    pub as_path: String,
    /// On `Ok`, the single matching object. On `AsMismatch`, every
    /// non-matching candidate (the timeline report needs the full list).
    pub candidates: Vec<Arc<RouteObject>>,
    pub code: RouteCheckCode,
}

/// Classifies one best path vector. `prefix` must already be parsed;
/// `iana_dir`/`route_dir` must be scoped to the same address family.
pub fn check_route(
    pv: &PathVector,
    prefix: &Prefix,
    iana_dir: &IanaDirectory,
    route_dir: &RouteDirectory,
) -> RouteCheckResult {
    let base = RouteCheckResult {
        prefix: prefix.to_canonical_string(),
        as_path: pv.as_path.clone(),
        candidates: Vec::new(),
        code: RouteCheckCode::MissingOrigin,
    };

    let tokens = normalize_as_path(&pv.as_path);
    if tokens.len() < 2 {
        return RouteCheckResult {
            code: RouteCheckCode::MissingOrigin,
            ..base
        };
    }
    // Aggregate origin: `{ AS1 AS2 }` splits into whitespace tokens like
    // `"{174"`/`"701}"`, so the brace never lands on the last token alone —
    // scan the whole path for a brace-bearing token, the way
    // `path_check::check_hop` detects an aggregate hop.
    if tokens.iter().any(|t| t.contains('{')) {
        return RouteCheckResult {
            code: RouteCheckCode::Aggregate,
            ..base
        };
    }
    let origin_tok = &tokens[tokens.len() - 1];

    let Some(entry) = iana_dir.resolve(prefix) else {
        return RouteCheckResult {
            code: RouteCheckCode::NonRipe,
            ..base
        };
    };
    if entry.rir != "RIPE NCC" {
        return RouteCheckResult {
            code: RouteCheckCode::NonRipe,
            ..base
        };
    }

    let objs = route_dir.get_route_objs(prefix);
    if objs.is_empty() {
        return RouteCheckResult {
            code: RouteCheckCode::NotFound,
            ..base
        };
    }

    let origin_bare = origin_tok
        .strip_prefix("AS")
        .or_else(|| origin_tok.strip_prefix("as"))
        .unwrap_or(origin_tok);
    let origin_as = format!("AS{origin_bare}");
    let mut mismatches = Vec::new();
    for obj in objs {
        if obj.origin.eq_ignore_ascii_case(&origin_as) {
            return RouteCheckResult {
                candidates: vec![obj],
                code: RouteCheckCode::Ok,
                ..base
            };
        }
        mismatches.push(obj);
    }

    RouteCheckResult {
        candidates: mismatches,
        code: RouteCheckCode::AsMismatch,
        ..base
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpsl::RouteObject;

    fn iana_ripe() -> IanaDirectory {
        let csv = "Prefix,Designation,Date,Whois,Status,RFC\n2.0.0.0/8,RIPE NCC,2009-09,N/A,Administered by RIPE NCC,\n";
        IanaDirectory::from_csv(csv.as_bytes(), false).unwrap()
    }

    fn pv(flags: &str, prefix: &str, as_path: &str) -> PathVector {
        PathVector {
            status_flags: flags.to_string(),
            prefix: Some(prefix.to_string()),
            next_hop: None,
            as_path: as_path.to_string(),
        }
    }

    /// S1 — route OK.
    #[test]
    fn s1_route_ok() {
        let iana = iana_ripe();
        let mut routes = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();
        routes.insert(RouteObject { prefix: p, origin: "AS8400".to_string(), member_of: vec![] });

        let v = pv(">", "2.10.0.0/16", "1299 8400 i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::Ok);
        assert_eq!(res.candidates.len(), 1);
    }

    /// S2 — route mismatch, candidate list carries the non-matching object.
    #[test]
    fn s2_route_mismatch() {
        let iana = iana_ripe();
        let mut routes = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();
        routes.insert(RouteObject { prefix: p, origin: "AS8400".to_string(), member_of: vec![] });

        let v = pv(">", "2.10.0.0/16", "1299 9999 i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::AsMismatch);
        assert_eq!(res.candidates[0].origin, "AS8400");
    }

    /// S3 — aggregate.
    #[test]
    fn s3_aggregate() {
        let iana = iana_ripe();
        let routes = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();

        let v = pv("", "2.10.0.0/16", "3356 {174 701} i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::Aggregate);
    }

    #[test]
    fn not_found_when_no_route_object() {
        let iana = iana_ripe();
        let routes = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();

        let v = pv(">", "2.10.0.0/16", "1299 8400 i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::NotFound);
    }

    #[test]
    fn non_ripe_prefix() {
        let iana = iana_ripe();
        let routes = RouteDirectory::new(false);
        let p = Prefix::parse("203.0.113.0/24", false).unwrap();

        let v = pv(">", "203.0.113.0/24", "1299 8400 i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::NonRipe);
    }

    #[test]
    fn missing_origin_short_path() {
        let iana = iana_ripe();
        let routes = RouteDirectory::new(false);
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();

        let v = pv(">", "2.10.0.0/16", "i");
        let res = check_route(&v, &p, &iana, &routes);
        assert_eq!(res.code, RouteCheckCode::MissingOrigin);
    }
}
