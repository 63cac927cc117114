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
//! RPSL object data model — C6. Each object class constructor pulls the
//! attributes it recognises from the C4 parser output and silently ignores
//! unknown attributes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use irrcheck_utils::{Prefix, PrefixError};

use super::expr::{parse_rule, ParsedRule, RuleParseError};
use super::parse::RpslObjectText;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("missing required attribute {0:?}")]
    MissingAttr(String),
    #[error("invalid prefix: {0}")]
    Prefix(#[from] PrefixError),
}

/// `route`/`route6` — identical shape; `is_ipv6` comes from the prefix
/// itself, so one struct serves both object classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteObject {
    pub prefix: Prefix,
    pub origin: String,
    pub member_of: Vec<String>,
}

impl RouteObject {
    pub fn from_rpsl(obj: &RpslObjectText, is_ipv6: bool) -> Result<Self, ObjectError> {
        let attr = if is_ipv6 { "route6" } else { "route" };
        let text = obj
            .get(attr)
            .ok_or_else(|| ObjectError::MissingAttr(attr.to_string()))?;
        let prefix = Prefix::parse(text, is_ipv6)?;
        let origin = obj
            .get("origin")
            .ok_or_else(|| ObjectError::MissingAttr("origin".to_string()))?
            .trim()
            .to_ascii_uppercase();
        let member_of = obj
            .get_all("member-of")
            .flat_map(|v| v.split_whitespace())
            .map(|s| s.trim_end_matches(',').to_ascii_uppercase())
            .collect();
        Ok(RouteObject {
            prefix,
            origin,
            member_of,
        })
    }
}

/// One `import`/`export`/`default` line, decomposed into its `ParsedRule`
/// eagerly at construction time (the reference implementation parses
/// lazily, caching the result in the pickle; since directories here are
/// already immutable once built, eager parsing is simpler and equivalent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutNumRule {
    pub raw_text: String,
    pub multi_protocol: bool,
    pub parsed: ParsedRule,
}

impl AutNumRule {
    pub fn parse(raw_text: &str, multi_protocol: bool, is_default: bool) -> Result<Self, RuleParseError> {
        let parsed = parse_rule(raw_text, multi_protocol, is_default)?;
        Ok(AutNumRule {
            raw_text: raw_text.to_string(),
            multi_protocol,
            parsed,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutNumObject {
    pub asn: String,
    pub import: Vec<AutNumRule>,
    pub export: Vec<AutNumRule>,
    pub mp_import: Vec<AutNumRule>,
    pub mp_export: Vec<AutNumRule>,
    pub member_of: Vec<String>,
}

impl AutNumObject {
    pub fn from_rpsl(obj: &RpslObjectText) -> Result<Self, ObjectError> {
        let asn = obj
            .get("aut-num")
            .ok_or_else(|| ObjectError::MissingAttr("aut-num".to_string()))?
            .trim()
            .to_ascii_uppercase();

        let mut out = AutNumObject {
            asn,
            ..Default::default()
        };

        for v in obj.get_all("import") {
            push_parsed(&mut out.import, v, false, false);
        }
        for v in obj.get_all("export") {
            push_parsed(&mut out.export, v, false, false);
        }
        // `default` lines are modelled as import rules.
        for v in obj.get_all("default") {
            push_parsed(&mut out.import, v, false, true);
        }
        for v in obj.get_all("mp-import") {
            push_parsed(&mut out.mp_import, v, true, false);
        }
        for v in obj.get_all("mp-export") {
            push_parsed(&mut out.mp_export, v, true, false);
        }
        for v in obj.get_all("mp-default") {
            push_parsed(&mut out.mp_import, v, true, true);
        }
        out.member_of = obj
            .get_all("member-of")
            .flat_map(|v| v.split_whitespace())
            .map(|s| s.trim_end_matches(',').to_ascii_uppercase())
            .collect();

        Ok(out)
    }
}

fn push_parsed(into: &mut Vec<AutNumRule>, raw: &str, mp: bool, is_default: bool) {
    match AutNumRule::parse(raw, mp, is_default) {
        Ok(rule) => into.push(rule),
        Err(e) => log::warn!("dropping unparseable aut-num rule {raw:?}: {e}"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsSetObject {
    pub name: String,
    pub members: Vec<String>,
}

impl AsSetObject {
    pub fn from_rpsl(obj: &RpslObjectText) -> Result<Self, ObjectError> {
        let name = obj
            .get("as-set")
            .ok_or_else(|| ObjectError::MissingAttr("as-set".to_string()))?
            .trim()
            .to_ascii_uppercase();
        let members = obj
            .get_all("members")
            .flat_map(|v| v.split(','))
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(AsSetObject { name, members })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PeeringSetObject {
    pub name: String,
    pub peering: Vec<String>,
    pub mp_peering: Vec<String>,
}

impl PeeringSetObject {
    pub fn from_rpsl(obj: &RpslObjectText) -> Result<Self, ObjectError> {
        let name = obj
            .get("peering-set")
            .ok_or_else(|| ObjectError::MissingAttr("peering-set".to_string()))?
            .trim()
            .to_ascii_uppercase();
        let extract_first_token = |v: &str| -> Option<String> {
            v.split_whitespace().next().map(|s| s.to_ascii_uppercase())
        };
        let peering = obj.get_all("peering").filter_map(extract_first_token).collect();
        let mp_peering = obj
            .get_all("mp-peering")
            .filter_map(extract_first_token)
            .collect();
        Ok(PeeringSetObject {
            name,
            peering,
            mp_peering,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterSetObject {
    pub name: String,
    pub filter: Option<String>,
    pub mp_filter: Option<String>,
}

impl FilterSetObject {
    pub fn from_rpsl(obj: &RpslObjectText) -> Result<Self, ObjectError> {
        let name = obj
            .get("filter-set")
            .ok_or_else(|| ObjectError::MissingAttr("filter-set".to_string()))?
            .trim()
            .to_ascii_uppercase();
        Ok(FilterSetObject {
            name,
            filter: obj.get("filter").map(|s| s.to_string()),
            mp_filter: obj.get("mp-filter").map(|s| s.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteSetObject {
    pub name: String,
    pub members: Vec<String>,
    pub mp_members: Vec<String>,
}

impl RouteSetObject {
    pub fn from_rpsl(obj: &RpslObjectText) -> Result<Self, ObjectError> {
        let name = obj
            .get("route-set")
            .ok_or_else(|| ObjectError::MissingAttr("route-set".to_string()))?
            .trim()
            .to_ascii_uppercase();
        let members = obj
            .get_all("members")
            .flat_map(|v| v.split(','))
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        let mp_members = obj
            .get_all("mp-members")
            .flat_map(|v| v.split(','))
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(RouteSetObject {
            name,
            members,
            mp_members,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpsl::parse::parse_ripe_file;

    #[test]
    fn route_object_from_text() {
        let text = "route: 2.10.0.0/16\norigin: AS8400\nmember-of: RS-FOO\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let route = RouteObject::from_rpsl(&objs[0], false).unwrap();
        assert_eq!(route.prefix.to_canonical_string(), "2.10.0.0/16");
        assert_eq!(route.origin, "AS8400");
    }

    #[test]
    fn aut_num_default_becomes_import() {
        let text = "aut-num: AS1\ndefault: to AS2\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let an = AutNumObject::from_rpsl(&objs[0]).unwrap();
        assert_eq!(an.import.len(), 1);
        assert!(an.export.is_empty());
    }

    #[test]
    fn as_set_members_split_on_comma() {
        let text = "as-set: AS-FOO\nmembers: AS1, AS-BAR, AS2\n";
        let objs = parse_ripe_file(text.as_bytes()).unwrap();
        let set = AsSetObject::from_rpsl(&objs[0]).unwrap();
        assert_eq!(set.members, vec!["AS1", "AS-BAR", "AS2"]);
    }
}
