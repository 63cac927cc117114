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
//! Text reporting: per-day route/path summaries and the run-level
//! violations timeline. Line formats are this repository's own decision
//! (see `DESIGN.md`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use irrcheck_utils::Day;

use crate::pipeline::{CombinedCheckResult, DayCheckResult, PipelineError};
use crate::route_check::RouteCheckCode;
use crate::util::PathBufExt;

const ALL_ROUTE_CODES: [RouteCheckCode; 6] = [
    RouteCheckCode::Ok,
    RouteCheckCode::Aggregate,
    RouteCheckCode::MissingOrigin,
    RouteCheckCode::AsMismatch,
    RouteCheckCode::NotFound,
    RouteCheckCode::NonRipe,
];

fn family_suffix(is_ipv6: bool) -> &'static str {
    if is_ipv6 {
        "6"
    } else {
        ""
    }
}

/// Writes `bgp2routes<6?>.txt` and `bgp2paths<6?>.txt` for one day/family
/// into `/<result_root>/<day>/`.
pub fn write_day_reports(result_root: &Path, result: &DayCheckResult) -> Result<(), PipelineError> {
    let dir = result_root.to_path_buf().then_day(&result.day);
    std::fs::create_dir_all(&dir)?;

    let suffix = family_suffix(result.is_ipv6);
    write_routes_report(&dir.clone().then(format!("bgp2routes{suffix}.txt")), &result.rows)?;
    write_paths_report(&dir.then(format!("bgp2paths{suffix}.txt")), &result.rows)?;
    Ok(())
}

/// `bgp2routes.txt`: a `total:` line followed by one `"%s: %d"` line per
/// route-check code, in a fixed order.
fn write_routes_report(path: &Path, rows: &[CombinedCheckResult]) -> io::Result<()> {
    let mut totals: BTreeMap<i32, usize> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.route.code as i32).or_default() += 1;
    }

    let mut f = File::create(path)?;
    writeln!(f, "total: {}", rows.len())?;
    for code in ALL_ROUTE_CODES {
        let count = totals.get(&(code as i32)).copied().unwrap_or(0);
        writeln!(f, "{}: {count}", code.legend())?;
    }
    Ok(())
}

/// `bgp2paths.txt`: one explanatory line per best-path row (only those whose
/// route check passed and were therefore walked), followed by the
/// aggregate hop-index error distribution — how many hops at each position
/// along the walked paths carried each code.
fn write_paths_report(path: &Path, rows: &[CombinedCheckResult]) -> io::Result<()> {
    let mut f = File::create(path)?;

    let mut hop_index_codes: BTreeMap<usize, BTreeMap<i32, usize>> = BTreeMap::new();
    let mut walked = 0usize;
    let mut pre_check_failed = 0usize;

    for row in rows {
        match &row.path {
            None => {
                pre_check_failed += 1;
                writeln!(f, "{}: -1 (route check: {})", row.row.as_path, row.route.code.legend())?;
            }
            Some(path_res) => {
                walked += 1;
                let codes: Vec<String> = path_res
                    .per_hop
                    .iter()
                    .map(|h| format!("{}={}", h.asn, h.code))
                    .collect();
                writeln!(
                    f,
                    "{}: in_region={} {}",
                    path_res.as_path,
                    path_res.fully_in_region,
                    codes.join(" ")
                )?;
                for (i, hop) in path_res.per_hop.iter().enumerate() {
                    *hop_index_codes.entry(i).or_default().entry(hop.code).or_default() += 1;
                }
            }
        }
    }

    writeln!(f)?;
    writeln!(f, "walked: {walked}")?;
    writeln!(f, "pre-check failed: {pre_check_failed}")?;
    writeln!(f, "-- hop-index error distribution --")?;
    for (index, codes) in &hop_index_codes {
        let mut parts: Vec<String> = codes.iter().map(|(c, n)| format!("{c}={n}")).collect();
        parts.sort();
        writeln!(f, "hop {index}: {}", parts.join(" "))?;
    }
    Ok(())
}

/// One flagged prefix's day-by-day history, for `route_violations_timeline.txt`.
struct PrefixHistory {
    prefix: String,
    transitions: Vec<(Day, RouteCheckCode)>,
}

/// `route_violations_timeline.txt`: one block per prefix ever flagged
/// `AS_MISMATCH`/`NOT_FOUND`, one line per day it held that (or a
/// different) code, blocks separated by a blank line and a dash rule —
/// grounded on `report_route_timeline`'s block format.
pub fn write_violations_timeline(
    result_root: &Path,
    sorted_days: &[&DayCheckResult],
) -> Result<(), PipelineError> {
    let mut histories: BTreeMap<String, PrefixHistory> = BTreeMap::new();
    let mut ever_flagged: BTreeMap<String, bool> = BTreeMap::new();

    for day_result in sorted_days {
        for row in &day_result.rows {
            let prefix = row.route.prefix.clone();
            let flagged = matches!(
                row.route.code,
                RouteCheckCode::AsMismatch | RouteCheckCode::NotFound
            );
            *ever_flagged.entry(prefix.clone()).or_insert(false) |= flagged;
            histories
                .entry(prefix.clone())
                .or_insert_with(|| PrefixHistory { prefix, transitions: Vec::new() })
                .transitions
                .push((day_result.day, row.route.code));
        }
    }

    let path = result_root.to_path_buf().then("route_violations_timeline.txt");
    let mut f = File::create(path)?;
    let mut first = true;
    for (prefix, history) in &histories {
        if !ever_flagged.get(prefix).copied().unwrap_or(false) {
            continue;
        }
        if !first {
            writeln!(f)?;
            writeln!(f, "{}", "-".repeat(40))?;
        }
        first = false;
        writeln!(f, "{}", history.prefix)?;
        for (day, code) in &history.transitions {
            writeln!(f, "{day}: {}", code.legend())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bgp_table::PathVector;
    use crate::pipeline::CombinedCheckResult;
    use crate::route_check::RouteCheckResult;
    use tempfile::tempdir;

    fn combined(prefix: &str, code: RouteCheckCode) -> CombinedCheckResult {
        CombinedCheckResult {
            row: PathVector {
                status_flags: ">".to_string(),
                prefix: Some(prefix.to_string()),
                next_hop: None,
                as_path: "1 2".to_string(),
            },
            route: RouteCheckResult {
                prefix: prefix.to_string(),
                as_path: "1 2".to_string(),
                candidates: vec![],
                code,
            },
            path: None,
        }
    }

    #[test]
    fn routes_report_lists_total_and_every_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bgp2routes.txt");
        let rows = vec![
            combined("2.10.0.0/16", RouteCheckCode::Ok),
            combined("9.9.0.0/16", RouteCheckCode::AsMismatch),
        ];
        write_routes_report(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("total: 2\n"));
        assert!(text.contains("OK: 1"));
        assert!(text.contains("AS not match: 1"));
        assert!(text.contains("non-ripe: 0"));
    }

    #[test]
    fn timeline_skips_prefixes_never_flagged() {
        let dir = tempdir().unwrap();
        let day_result = DayCheckResult {
            day: Day::new(2024, 1, 1),
            is_ipv6: false,
            rows: vec![
                combined("2.10.0.0/16", RouteCheckCode::Ok),
                combined("9.9.0.0/16", RouteCheckCode::NotFound),
            ],
        };
        write_violations_timeline(dir.path(), &[&day_result]).unwrap();
        let text = std::fs::read_to_string(dir.path().join("route_violations_timeline.txt")).unwrap();
        assert!(text.contains("9.9.0.0/16"));
        assert!(!text.contains("2.10.0.0/16"));
    }
}
