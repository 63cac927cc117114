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
//! RPSL object parser — C4. Splits a flat RIPE-DB text file into objects
//! (blank-line delimited), strips comments, folds continuation lines and
//! yields `(attribute, value)` pairs in order. Attribute values keep their
//! original case — unlike the reference implementation, which upper-cases
//! everything and thereby loses regex case sensitivity in filter bodies;
//! callers upper-case tokens themselves at comparison sites.

use std::io::{self, BufRead};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpslObjectText {
    pub attrs: Vec<(String, String)>,
}

impl RpslObjectText {
    /// First value for `attr` (case-insensitive match on the attribute
    /// name), if present.
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(attr))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `attr`, in order — RPSL objects may repeat an
    /// attribute (e.g. multiple `member-of:` lines).
    pub fn get_all<'a>(&'a self, attr: &'a str) -> impl Iterator<Item = &'a str> {
        self.attrs
            .iter()
            .filter(move |(a, _)| a.eq_ignore_ascii_case(attr))
            .map(|(_, v)| v.as_str())
    }
}

/// Discards comments (`#…` and lines whose first non-space character is
/// `%`) and blank lines, keeping the rest verbatim.
fn cleanup_lines(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    for l in lines {
        let l = match l.find('#') {
            Some(idx) => l[..idx].to_string(),
            None => l,
        };
        if l.trim().is_empty() {
            continue;
        }
        if l.starts_with('%') {
            continue;
        }
        out.push(l);
    }
    out
}

/// Folds continuation lines (leading whitespace or `+`) into the previous
/// attribute's value, collapsing internal whitespace to single spaces, and
/// yields `(attribute, value)` pairs in order.
fn split_lines(lines: &[String]) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    let mut buf: Option<(String, String)> = None;

    for l in lines {
        let first = l.chars().next().unwrap_or(' ');
        if let Some((attr, val)) = &mut buf {
            if first.is_whitespace() || first == '+' {
                let cont = l[1..].trim();
                val.push(' ');
                val.push_str(cont);
                *val = val.trim().to_string();
                continue;
            } else {
                out.push((attr.clone(), val.clone()));
            }
        }

        let trimmed = l.trim();
        let mut parts = trimmed.splitn(2, ':');
        let attr = parts.next().ok_or_else(|| format!("can not parse line: {l:?}"))?;
        let val = parts
            .next()
            .ok_or_else(|| format!("can not parse line: {l:?}"))?;
        buf = Some((attr.trim().to_string(), val.trim().to_string()));
    }
    if let Some((attr, val)) = buf {
        if !attr.trim().is_empty() {
            out.push((attr, val));
        }
    }
    Ok(out)
}

/// Parses one flat RIPE object file into a sequence of objects, each a
/// vector of `(attribute, value)` pairs. An object that is empty after
/// comment stripping is silently dropped (the original text was probably
/// all-comment noise between real objects).
pub fn parse_ripe_file<R: BufRead>(reader: R) -> io::Result<Vec<RpslObjectText>> {
    let mut objects = Vec::new();
    let mut current: Vec<String> = Vec::new();

    let mut flush = |buf: &mut Vec<String>, objects: &mut Vec<RpslObjectText>| {
        if buf.is_empty() {
            return;
        }
        let cleaned = cleanup_lines(std::mem::take(buf));
        if cleaned.is_empty() {
            return;
        }
        match split_lines(&cleaned) {
            Ok(attrs) if !attrs.is_empty() => objects.push(RpslObjectText { attrs }),
            Ok(_) => {}
            Err(e) => log::warn!("dropping malformed rpsl object: {e}"),
        }
    };

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            flush(&mut current, &mut objects);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut objects);

    Ok(objects)
}
