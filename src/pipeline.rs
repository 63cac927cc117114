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
//! Snapshot pipeline — C12. Unpacks one day's RIPE-DB tarball into a
//! directory bundle, persists it, and (in a second fan-out) runs the route
//! and path checkers over one day's BGP table dumps.
//!
//! Filesystem enumeration of raw input directories and CLI dispatch are
//! external collaborators; every entry point here takes paths the caller
//! has already resolved for one named day.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tar::Archive;
use tempfile::TempDir;
use thiserror::Error;

use irrcheck_utils::Day;

use crate::bgp_table::{self, BgpTableError, PathVector};
use crate::iana::IanaDirectory;
use crate::path_check::{self, PathCheckDirs, PathCheckResult};
use crate::route_check::{self, RouteCheckResult};
use crate::rpsl::{
    self, enrich_member_of, AsSetObject, AutNumObject, FilterSetObject, HashDirectory, MatchDirs,
    ObjectError, PeeringSetObject, RouteDirectory, RouteSetObject,
};
use crate::util::PathBufExt;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("bgp table parse error: {0}")]
    BgpTable(#[from] BgpTableError),
    #[error("missing expected archive member {0:?}")]
    MissingArchiveMember(&'static str),
    #[error("persisted artifact corrupt or wrong version: {0}")]
    Bincode(#[from] bincode::Error),
}

/// The seven flat files a `ripedb-*.tar.bz2` archive unpacks to.
const RIPE_MEMBERS: [&str; 7] = [
    "ripe.db.route",
    "ripe.db.route6",
    "ripe.db.aut-num",
    "ripe.db.as-set",
    "ripe.db.route-set",
    "ripe.db.filter-set",
    "ripe.db.peering-set",
];

/// Per-day persisted bundle. Read-only once built; consumed by
/// `process_day`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyArtifacts {
    pub day: Day,
    pub route4: RouteDirectory,
    pub route6: RouteDirectory,
    pub autnum: HashDirectory<AutNumObject>,
    pub asset: HashDirectory<AsSetObject>,
    pub filterset: HashDirectory<FilterSetObject>,
    pub routeset: HashDirectory<RouteSetObject>,
    pub peeringset: HashDirectory<PeeringSetObject>,
}

/// `/<result_root>/<day>/ripe.artifacts.bin` — the one file a restarted
/// pipeline needs to skip re-parsing a day's RIPE archive.
fn artifacts_path(result_root: &Path, day: &Day) -> PathBuf {
    result_root.to_path_buf().then_day(day).then("ripe.artifacts.bin")
}

/// Unpacks `ripe_tarball` into a scoped scratch directory (released on every
/// exit path, including panics, via `TempDir`'s `Drop`), parses the seven
/// RPSL flat files, runs the member-of enrichment pass, and persists the
/// result under `result_root`.
pub fn preprocess_day(
    day: Day,
    ripe_tarball: &Path,
    result_root: &Path,
) -> Result<DailyArtifacts, PipelineError> {
    let scratch = TempDir::new()?;
    unpack_tarball(ripe_tarball, scratch.path())?;
    for member in RIPE_MEMBERS {
        if !scratch.path().join(member).exists() {
            return Err(PipelineError::MissingArchiveMember(member));
        }
    }

    let mut route4 = RouteDirectory::new(false);
    let mut route6 = RouteDirectory::new(true);
    let mut autnum = HashDirectory::new();
    let mut asset = HashDirectory::new();
    let mut filterset = HashDirectory::new();
    let mut routeset = HashDirectory::new();
    let mut peeringset = HashDirectory::new();

    load_objects(&scratch.path().join("ripe.db.route"), |obj| {
        parse_and_log("route", &obj, |t| crate::rpsl::RouteObject::from_rpsl(t, false))
            .map(|o| route4.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.route6"), |obj| {
        parse_and_log("route6", &obj, |t| crate::rpsl::RouteObject::from_rpsl(t, true))
            .map(|o| route6.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.aut-num"), |obj| {
        parse_and_log("aut-num", &obj, AutNumObject::from_rpsl).map(|o| autnum.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.as-set"), |obj| {
        parse_and_log("as-set", &obj, AsSetObject::from_rpsl).map(|o| asset.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.route-set"), |obj| {
        parse_and_log("route-set", &obj, RouteSetObject::from_rpsl).map(|o| routeset.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.filter-set"), |obj| {
        parse_and_log("filter-set", &obj, FilterSetObject::from_rpsl).map(|o| filterset.insert(o));
    })?;
    load_objects(&scratch.path().join("ripe.db.peering-set"), |obj| {
        parse_and_log("peering-set", &obj, PeeringSetObject::from_rpsl).map(|o| peeringset.insert(o));
    })?;

    enrich_member_of(&mut asset, &mut routeset, &autnum, &route4, &route6);

    let artifacts = DailyArtifacts {
        day,
        route4,
        route6,
        autnum,
        asset,
        filterset,
        routeset,
        peeringset,
    };
    persist(&artifacts, result_root)?;
    Ok(artifacts)
}

/// Runs over every RPSL object in `path`, handing each to `f`. A file that
/// does not exist for this archive (e.g. no `peering-set` dump that day) is
/// silently treated as empty, not an error — only a missing BGP/RIPE
/// archive entirely aborts the day.
fn load_objects(
    path: &Path,
    mut f: impl FnMut(rpsl::RpslObjectText),
) -> Result<(), PipelineError> {
    if !path.exists() {
        return Ok(());
    }
    let file = File::open(path)?;
    let objs = rpsl::parse_ripe_file(BufReader::new(file))?;
    for obj in objs {
        f(obj);
    }
    Ok(())
}

/// Parsing errors for one object are logged and the object dropped; the
/// directory otherwise stays consistent.
fn parse_and_log<T>(
    class: &str,
    obj: &rpsl::RpslObjectText,
    parse: impl FnOnce(&rpsl::RpslObjectText) -> Result<T, ObjectError>,
) -> Option<T> {
    match parse(obj) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("dropping unparseable {class} object: {e}");
            None
        }
    }
}

fn unpack_tarball(tarball: &Path, dest: &Path) -> Result<(), PipelineError> {
    let file = File::open(tarball)?;
    let decoder = BzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}

fn persist(artifacts: &DailyArtifacts, result_root: &Path) -> Result<(), PipelineError> {
    let path = artifacts_path(result_root, &artifacts.day);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(artifacts)?;
    let mut f = File::create(path)?;
    f.write_all(&bytes)?;
    Ok(())
}

/// Reloads a previously-persisted day, letting a restarted run skip
/// re-parsing the RIPE archive entirely.
pub fn load_artifacts(result_root: &Path, day: &Day) -> Result<DailyArtifacts, PipelineError> {
    let bytes = std::fs::read(artifacts_path(result_root, day))?;
    Ok(bincode::deserialize(&bytes)?)
}

/// One BGP row's combined route/path verdict. `path` is `None` exactly when
/// the route check did not pass — the path is then never walked, and the
/// report writer records hop code `-1` for it.
pub struct CombinedCheckResult {
    pub row: PathVector,
    pub route: RouteCheckResult,
    pub path: Option<PathCheckResult>,
}

/// Per-family check outcome for one day, ready for `report::write_day_reports`.
pub struct DayCheckResult {
    pub day: Day,
    pub is_ipv6: bool,
    pub rows: Vec<CombinedCheckResult>,
}

/// Runs the route checker (always) and the path checker (only on a passing
/// route check) over every best-path row of one decompressed BGP table
/// dump, then writes the per-day text reports.
#[allow(clippy::too_many_arguments)]
pub fn process_day(
    day: Day,
    bgp_dump: &Path,
    is_ipv6: bool,
    artifacts: &DailyArtifacts,
    iana_dir: &IanaDirectory,
    observer_asn: Option<&str>,
    result_root: &Path,
) -> Result<DayCheckResult, PipelineError> {
    let reader = bgp_table::open_text(bgp_dump)?;
    let table = bgp_table::parse_cisco_bgp_table(reader)?;

    let route_dir = if is_ipv6 { &artifacts.route6 } else { &artifacts.route4 };
    let matcher = MatchDirs {
        filter: rpsl::FilterDirs {
            asset: &artifacts.asset,
            filterset: &artifacts.filterset,
            routeset: &artifacts.routeset,
        },
        peeringset: &artifacts.peeringset,
    };
    let path_dirs = PathCheckDirs {
        autnum: &artifacts.autnum,
        matcher: &matcher,
    };

    let mut rows = Vec::new();
    for row in table.into_iter().filter(PathVector::is_best) {
        let Some(prefix) = row.parsed_prefix(is_ipv6) else {
            log::warn!("dropping best row with unparseable prefix: {:?}", row.prefix);
            continue;
        };
        let route = route_check::check_route(&row, &prefix, iana_dir, route_dir);
        let path = if route.code == crate::route_check::RouteCheckCode::Ok {
            Some(path_check::check_path(&row, &prefix, &path_dirs, is_ipv6, observer_asn))
        } else {
            None
        };
        rows.push(CombinedCheckResult { row, route, path });
    }

    let result = DayCheckResult { day, is_ipv6, rows };
    crate::report::write_day_reports(result_root, &result)?;
    Ok(result)
}

/// Day-level fan-out: preprocessing and processing are separate
/// `into_par_iter()` passes — one independent unit of work per day, joined
/// at the end, no shared mutable state beyond each day's own result
/// subdirectory.
pub fn par_preprocess_days(
    days: &[(Day, PathBuf)],
    result_root: &Path,
) -> Vec<Result<DailyArtifacts, PipelineError>> {
    days.into_par_iter()
        .map(|(day, tarball)| preprocess_day(*day, tarball, result_root))
        .collect()
}

/// Day-level fan-out over a day's already-loaded artifacts and its BGP
/// dumps for both address families.
pub fn par_process_days(
    jobs: &[(Day, DailyArtifacts, Option<PathBuf>, Option<PathBuf>)],
    iana4: &IanaDirectory,
    iana6: &IanaDirectory,
    observer_asn: Option<&str>,
    result_root: &Path,
) -> Vec<Result<Vec<DayCheckResult>, PipelineError>> {
    jobs.into_par_iter()
        .map(|(day, artifacts, bgp4, bgp6)| {
            let mut out = Vec::new();
            if let Some(bgp4) = bgp4 {
                out.push(process_day(*day, bgp4, false, artifacts, iana4, observer_asn, result_root)?);
            }
            if let Some(bgp6) = bgp6 {
                out.push(process_day(*day, bgp6, true, artifacts, iana6, observer_asn, result_root)?);
            }
            Ok(out)
        })
        .collect()
}

/// Single-threaded post-phase aggregation over days in sorted order (spec
/// §5): builds the cross-day violation timeline.
pub fn postprocess_run(
    result_root: &Path,
    daily_results: &[DayCheckResult],
) -> Result<(), PipelineError> {
    let mut sorted: Vec<&DayCheckResult> = daily_results.iter().collect();
    sorted.sort_by_key(|r| r.day);
    crate::report::write_violations_timeline(result_root, &sorted)?;
    Ok(())
}
