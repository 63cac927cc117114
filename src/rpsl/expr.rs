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
//! RPSL expression model — C7. Tagged AST for `import`/`export`/`default`
//! rule text: AFI extraction, brace-group/selector decomposition, and
//! per-factor `(subject, filter)` normalisation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("can not split expression: {0:?}")]
    CanNotSplit(String),
    #[error("can not find filter factors in: {0:?}")]
    NoFactors(String),
    #[error("can not parse factor: {0:?}")]
    BadFactor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Afi {
    Any,
    Ipv4Unicast,
    Ipv6Unicast,
    Other,
}

impl Afi {
    pub fn from_token(tok: &str) -> Afi {
        match tok.to_ascii_uppercase().as_str() {
            "ANY" | "ANY.UNICAST" => Afi::Any,
            "IPV4.UNICAST" | "IPV4" => Afi::Ipv4Unicast,
            "IPV6.UNICAST" | "IPV6" => Afi::Ipv6Unicast,
            _ => Afi::Other,
        }
    }

    /// Does this AFI admit a lookup for the given family?
    pub fn admits(&self, is_ipv6: bool) -> bool {
        match self {
            Afi::Any => true,
            Afi::Ipv4Unicast => !is_ipv6,
            Afi::Ipv6Unicast => is_ipv6,
            Afi::Other => false,
        }
    }
}

/// One `(subject_token, filter_text)` factor extracted from a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub subject: String,
    pub filter_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRule {
    pub afi: Afi,
    pub factors: Vec<Factor>,
}

/// Parses raw `import`/`export`/`default`/`mp-import`/`mp-export` rule text
/// into a `ParsedRule`. `is_default` relaxes the "no selector keyword found"
/// case to `ANY` rather than an error.
pub fn parse_rule(raw: &str, multi_protocol: bool, is_default: bool) -> Result<ParsedRule, RuleParseError> {
    let afi = extract_afi(raw, multi_protocol);
    let (selector_factors, common_filter) = decompose_expression(raw, is_default)?;

    let mut factors = Vec::with_capacity(selector_factors.len());
    for sel in selector_factors {
        factors.push(normalize_factor(&sel, &common_filter)?);
    }
    Ok(ParsedRule { afi, factors })
}

fn extract_afi(raw: &str, multi_protocol: bool) -> Afi {
    if !multi_protocol {
        return Afi::Ipv4Unicast;
    }
    let trimmed = raw.trim_start();
    if let Some(rest) = strip_ci_prefix(trimmed, "AFI") {
        let rest = rest.trim_start();
        if let Some(tok) = rest.split_whitespace().next() {
            return Afi::from_token(tok);
        }
    }
    Afi::Any
}

fn strip_ci_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// Case-insensitive search for a whitespace-delimited keyword; returns the
/// byte offset of the keyword's first character.
fn find_keyword_ci(haystack: &str, keyword: &str) -> Option<usize> {
    let upper_hay = haystack.to_ascii_uppercase();
    let upper_kw = keyword.to_ascii_uppercase();
    let mut start = 0;
    while let Some(rel) = upper_hay[start..].find(&upper_kw) {
        let idx = start + rel;
        let before_ok = idx == 0 || haystack.as_bytes()[idx - 1].is_ascii_whitespace();
        let after_idx = idx + keyword.len();
        let after_ok = after_idx >= haystack.len() || haystack.as_bytes()[after_idx].is_ascii_whitespace();
        if before_ok && after_ok {
            return Some(idx);
        }
        start = idx + 1;
    }
    None
}

/// Splits rule text into `(selector_factors, common_filter_text)`.
/// Selector factors are `"FROM <tok>"`/`"TO <tok>"` fragments, one per
/// neighbour in a multi-`FROM`/multi-`TO` selector list.
fn decompose_expression(text: &str, is_default: bool) -> Result<(Vec<String>, String), RuleParseError> {
    let trimmed = text.trim();
    let e = if trimmed.starts_with('{') {
        let body_end = trimmed
            .rfind('}')
            .ok_or_else(|| RuleParseError::CanNotSplit(text.to_string()))?;
        trimmed[1..body_end].trim().to_string()
    } else {
        trimmed.to_string()
    };

    let (sel, fltr) = if let Some(idx) = find_keyword_ci(&e, "ACCEPT") {
        (e[..idx].trim().to_string(), e[idx..].trim().to_string())
    } else if let Some(idx) = find_keyword_ci(&e, "ANNOUNCE") {
        (e[..idx].trim().to_string(), e[idx..].trim().to_string())
    } else if let Some(idx) = find_keyword_ci(&e, "NETWORKS") {
        (e[..idx].trim().to_string(), e[idx..].trim().to_string())
    } else if is_default {
        (e.clone(), "ANY".to_string())
    } else {
        log::warn!("syntax error: can not find selectors in: {e:?}");
        (e.clone(), String::new())
    };

    if let Some(idx) = find_keyword_ci(&sel, "FROM") {
        let pieces: Vec<String> = split_on_keyword(&sel[idx..], "FROM")
            .into_iter()
            .skip(1)
            .map(|p| format!("FROM {p}"))
            .collect();
        Ok((pieces, fltr))
    } else if let Some(idx) = find_keyword_ci(&sel, "TO") {
        let pieces: Vec<String> = split_on_keyword(&sel[idx..], "TO")
            .into_iter()
            .skip(1)
            .map(|p| format!("TO {p}"))
            .collect();
        Ok((pieces, fltr))
    } else if is_default {
        // `default:` rules without an explicit `TO` apply to every neighbour;
        // represented as a single wildcard-subject factor.
        Ok((vec!["TO ANY".to_string()], fltr))
    } else {
        Err(RuleParseError::NoFactors(sel))
    }
}

fn split_on_keyword(text: &str, keyword: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    loop {
        match find_keyword_ci(rest, keyword) {
            Some(idx) => {
                pieces.push(rest[..idx].trim().to_string());
                rest = &rest[idx + keyword.len()..];
            }
            None => {
                pieces.push(rest.trim().to_string());
                break;
            }
        }
    }
    pieces
}

fn normalize_factor(factor: &str, common_filter: &str) -> Result<Factor, RuleParseError> {
    let mut combined = format!("{} {}", factor.trim(), common_filter.trim())
        .trim()
        .to_string();
    if combined.ends_with(';') {
        combined.pop();
        combined = combined.trim().to_string();
    }

    if let Some(rest) = strip_ci_prefix(&combined, "FROM") {
        let rest = rest.trim_start();
        let subject = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| RuleParseError::BadFactor(combined.clone()))?
            .to_string();
        let filter_text = match find_keyword_ci(rest, "ACCEPT") {
            Some(idx) => rest[idx + "ACCEPT".len()..].trim().to_string(),
            None => "ANY".to_string(),
        };
        let filter_text = if filter_text.is_empty() { "ANY".to_string() } else { filter_text };
        return Ok(Factor { subject, filter_text });
    }

    if let Some(rest) = strip_ci_prefix(&combined, "TO") {
        let rest = rest.trim_start();
        let subject = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| RuleParseError::BadFactor(combined.clone()))?
            .to_string();
        let filter_text = if let Some(idx) = find_keyword_ci(rest, "ANNOUNCE") {
            rest[idx + "ANNOUNCE".len()..].trim().to_string()
        } else if let Some(idx) = find_keyword_ci(rest, "NETWORKS") {
            rest[idx + "NETWORKS".len()..].trim().to_string()
        } else {
            "ANY".to_string()
        };
        let filter_text = if filter_text.is_empty() { "ANY".to_string() } else { filter_text };
        return Ok(Factor { subject, filter_text });
    }

    Err(RuleParseError::BadFactor(combined))
}
