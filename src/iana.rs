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
//! IANA allocation directory — C5. Maps top-level IP-space allocations to
//! their RIR using the C2 trie, grounded on `ianaspace.py::IanaDirectory`.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use irrcheck_utils::{normalize_ipv4_classful, Prefix, PrefixError, PrefixTrie};

/// The five recognised RIRs. A `LEGACY` allocation whose RIR text is none
/// of these collapses to `rir = "LEGACY"`.
pub const RIRS: [&str; 5] = ["LACNIC", "APNIC", "ARIN", "RIPE NCC", "AFRINIC"];

#[derive(Debug, Error)]
pub enum IanaError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid prefix in iana csv row {0:?}: {1}")]
    Prefix(String, PrefixError),
    #[error("iana csv row too short: {0:?}")]
    ShortRow(Vec<String>),
}

/// `(net, status, rir)` — one row of an IANA allocation CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IanaEntry {
    pub net: Prefix,
    pub status: String,
    pub rir: String,
}

/// Trie-backed directory resolving any prefix to its top-level IANA
/// allocation. `resolve` only needs `lookup_first`: the most general
/// containing allocation already carries the RIR attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IanaDirectory {
    tree: PrefixTrie<IanaEntry>,
}

impl IanaDirectory {
    /// Parses an IANA allocation CSV (header row skipped). IPv4 rows carry
    /// status at column index 4; IPv6 rows carry status at index 5 and RIR
    /// at index 1. IPv4 prefixes pass through classful-mask inference;
    /// `Administered by ` is stripped from RIR names.
    pub fn from_csv<R: Read>(reader: R, is_ipv6: bool) -> Result<Self, IanaError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut tree = PrefixTrie::new(is_ipv6);
        for (i, result) in rdr.records().enumerate() {
            if i == 0 {
                continue;
            }
            let record = result?;
            let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            let (status, rir) = if is_ipv6 {
                let status = row.get(5).cloned().unwrap_or_default();
                let rir = row.get(1).cloned().unwrap_or_default();
                (status, rir)
            } else {
                let status = row.get(4).cloned().unwrap_or_default();
                let rir = row
                    .get(1)
                    .map(|s| s.replace("Administered by ", "").trim().to_string())
                    .unwrap_or_default();
                (status, rir)
            };

            let pfx_text = row.first().cloned().unwrap_or_default();
            if pfx_text.is_empty() {
                return Err(IanaError::ShortRow(row));
            }

            let net = if is_ipv6 {
                Prefix::parse(&pfx_text, true).map_err(|e| IanaError::Prefix(pfx_text.clone(), e))?
            } else {
                normalize_ipv4_classful(&pfx_text).map_err(|e| IanaError::Prefix(pfx_text.clone(), e))?
            };

            let rir = if status.eq_ignore_ascii_case("LEGACY") && !RIRS.contains(&rir.as_str()) {
                "LEGACY".to_string()
            } else {
                rir
            };

            tree.insert(net, IanaEntry { net, status, rir });
        }

        Ok(IanaDirectory { tree })
    }

    /// `resolve(prefix)` — the most-general containing allocation, per spec
    /// §4.4 (`lookup_first` suffices for RIR attribution).
    pub fn resolve(&self, prefix: &Prefix) -> Option<IanaEntry> {
        self.tree.lookup_first(prefix).map(|(_, entry)| entry)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const IPV4_CSV: &str = "Prefix,Designation,Date,Whois,Status,RFC\n2.0.0.0/8,RIPE NCC,2009-09,N/A,Administered by RIPE NCC,\n0.0.0.0/8,IANA,1981-09,N/A,RESERVED,\n";

    #[test]
    fn resolves_ripe_allocation() {
        let dir = IanaDirectory::from_csv(IPV4_CSV.as_bytes(), false).unwrap();
        let p = Prefix::parse("2.10.0.0/16", false).unwrap();
        let entry = dir.resolve(&p).unwrap();
        assert_eq!(entry.rir, "RIPE NCC");
    }

    #[test]
    fn legacy_non_rir_collapses() {
        let csv = "Prefix,Designation,Date,Whois,Status,RFC\n37.0.0.0/8,Legacy,1991-05,N/A,LEGACY,\n";
        let dir = IanaDirectory::from_csv(csv.as_bytes(), false).unwrap();
        let p = Prefix::parse("37.1.2.0/24", false).unwrap();
        let entry = dir.resolve(&p).unwrap();
        assert_eq!(entry.rir, "LEGACY");
    }

    #[test]
    fn unknown_prefix_resolves_to_none() {
        let dir = IanaDirectory::from_csv(IPV4_CSV.as_bytes(), false).unwrap();
        let p = Prefix::parse("203.0.113.0/24", false).unwrap();
        assert!(dir.resolve(&p).is_none());
    }
}
