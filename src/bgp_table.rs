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
//! Stream-oriented parser over Cisco `show ip bgp` / `show ipv6 bgp` text
//! dumps — C3. Detects the column layout from the header row and emits one
//! `PathVector` per data row that reaches the `Path` column.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use irrcheck_utils::Prefix;

lazy_static! {
    static ref HEADER_REGEX: Regex = Regex::new(r"^.+ (Next Hop) .+ (Path).*$").unwrap();
    static ref LINE_START_REGEX: Regex =
        Regex::new(r"^\s*([>isdhRSfxacmb\*]*)([0-9\s].*)?").unwrap();
    static ref ADDR_REGEX: Regex = Regex::new(
        r"^(?:.*\s)?([a-fA-F0-9]{0,4}:[a-fA-F0-9:]+|[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3})(?:\s+.*)?"
    )
    .unwrap();
    static ref PREFIX_REGEX: Regex = Regex::new(
        r"^(?:[>isdhRSfxacmb\s\*]*[i\s]+)?([a-fA-F0-9]{0,4}:[a-fA-F0-9:]+[/0-9]{0,4}|(?:[0-9.]{1,4}){1,4}[/0-9]{0,3})(?:\s+.*)?"
    )
    .unwrap();
}

#[derive(Debug, Error)]
pub enum BgpTableError {
    #[error("io error reading bgp table: {0}")]
    Io(#[from] io::Error),
}

/// One row of a BGP table: `(status_flags, prefix, next_hop, as_path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathVector {
    pub status_flags: String,
    pub prefix: Option<String>,
    pub next_hop: Option<String>,
    pub as_path: String,
}

impl PathVector {
    pub fn is_best(&self) -> bool {
        self.status_flags.contains('>')
    }

    /// Parses the prefix text into a normalised `Prefix`, applying classful
    /// inference for IPv4. Returns `None` when the row never carried a
    /// prefix (a continuation row whose text predecessor was itself
    /// unparseable) or when parsing fails.
    pub fn parsed_prefix(&self, is_ipv6: bool) -> Option<Prefix> {
        let text = self.prefix.as_ref()?;
        Prefix::parse(text, is_ipv6).ok()
    }

    /// `AsPath` per §3: whitespace tokens with the trailing origin marker
    /// (`i`/`e`/`?`) and aggregate braces removed; the rightmost remaining
    /// token is the origin, the leftmost is the observer's neighbour.
    pub fn as_path_asns(&self) -> Vec<String> {
        normalize_as_path(&self.as_path)
    }
}

/// Strips the trailing origin-marker token and splits on whitespace,
/// leaving `{…}` aggregate markers in place (callers decide how to treat
/// them — see the route checker's aggregate detection).
pub fn normalize_as_path(as_path: &str) -> Vec<String> {
    let mut tokens: Vec<&str> = as_path.split_whitespace().collect();
    if matches!(tokens.last().copied(), Some("i") | Some("e") | Some("?")) {
        tokens.pop();
    }
    tokens.into_iter().map(|t| t.to_string()).collect()
}

/// Opens `.bz2`/plain text transparently based on filename suffix (`.gz` is
/// explicitly unsupported, mirroring the original tool).
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, BgpTableError> {
    let file = File::open(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("bz2") {
        Ok(Box::new(BufReader::new(BzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parses an already-decompressed BGP table dump into `PathVector`s.
pub fn parse_cisco_bgp_table<R: Read>(reader: R) -> Result<Vec<PathVector>, BgpTableError> {
    let reader = BufReader::new(reader);
    let mut nhbeg: Option<usize> = None;
    let mut apbeg: Option<usize> = None;

    let mut indicator = String::new();
    let mut prefix: Option<String> = None;
    let mut next_hop: Option<String> = None;

    let mut out = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let l = line.trim_end();

        if nhbeg.is_none() && apbeg.is_none() {
            if let Some(caps) = HEADER_REGEX.captures(l) {
                nhbeg = caps.get(1).map(|m| m.start());
                apbeg = caps.get(2).map(|m| m.start());
            }
            continue;
        }
        let nhbeg = nhbeg.unwrap();
        let apbeg = apbeg.unwrap();

        if let Some(caps) = LINE_START_REGEX.captures(l) {
            if let Some(m) = caps.get(1) {
                if !m.as_str().is_empty() {
                    indicator = m.as_str().to_string();
                }
            }
        }

        if let Some(caps) = PREFIX_REGEX.captures(l) {
            if let Some(m) = caps.get(1) {
                if m.start() < nhbeg {
                    prefix = Some(m.as_str().to_string());
                }
            }
        }

        if let Some(caps) = ADDR_REGEX.captures(l) {
            if let Some(m) = caps.get(1) {
                if m.start() >= nhbeg {
                    next_hop = Some(m.as_str().to_string());
                }
            }
        }

        let bytes = l.as_bytes();
        if bytes.len() > apbeg && bytes[apbeg - 1].is_ascii_whitespace() {
            let as_path = l[apbeg..].to_string();
            out.push(PathVector {
                status_flags: indicator.clone(),
                prefix: prefix.clone(),
                next_hop: next_hop.clone(),
                as_path,
            });
            indicator.clear();
        } else if bytes.len() > apbeg && bytes[apbeg].is_ascii_whitespace() {
            let as_path = l[apbeg + 1..].to_string();
            out.push(PathVector {
                status_flags: indicator.clone(),
                prefix: prefix.clone(),
                next_hop: next_hop.clone(),
                as_path,
            });
            indicator.clear();
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "BGP table version is 12345, local router ID is 10.0.0.1\nStatus codes: s suppressed, d damped, h history, * valid, > best, i - internal\nOrigin codes: i - IGP, e - EGP, ? - incomplete\n\n   Network          Next Hop            Metric LocPrf Weight Path\n*> 2.10.0.0/16      192.0.2.1                              0 1299 8400 i\n*  9.9.0.0/16       192.0.2.1                              0 3356 {174 701} i\n";

    #[test]
    fn parses_best_route_row() {
        let rows = parse_cisco_bgp_table(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_best());
        assert_eq!(rows[0].prefix.as_deref(), Some("2.10.0.0/16"));
        assert_eq!(rows[0].as_path_asns(), vec!["1299", "8400"]);
    }

    #[test]
    fn aggregate_braces_survive_normalisation() {
        let rows = parse_cisco_bgp_table(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows[1].as_path_asns(), vec!["3356", "{174", "701}"]);
    }
}
