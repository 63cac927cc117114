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
//! Logging setup and small filesystem helpers shared across the pipeline.

use std::path::{Path, PathBuf};

use irrcheck_utils::Day;

/// Initialises `log4rs` from `log4rs.yml` in the current directory, falling
/// back to `pretty_env_logger` (driven by `RUST_LOG`) when no config file is
/// present — convenient for tests and one-off binaries that never ship a
/// `log4rs.yml`.
pub fn init_logging() {
    if Path::new("log4rs.yml").exists() {
        log4rs::init_file("log4rs.yml", Default::default()).unwrap();
    } else {
        let _ = pretty_env_logger::try_init();
    }
}

/// Builder-style extension for assembling day-scoped result paths:
/// `/<result_root>/<YYYY-MM-DD>/<name>`.
pub trait PathBufExt: Sized {
    fn then(self, p: impl AsRef<Path>) -> PathBuf;

    fn then_day(self, day: &Day) -> PathBuf {
        self.then(day.to_string())
    }
}

impl PathBufExt for PathBuf {
    fn then(mut self, p: impl AsRef<Path>) -> PathBuf {
        self.push(p);
        self
    }
}

impl PathBufExt for &Path {
    fn then(self, p: impl AsRef<Path>) -> PathBuf {
        let mut path = self.to_path_buf();
        path.push(p);
        path
    }
}

/// `/<result_root>/<day>` — the one shared-mutable resource workers touch,
/// always below a day-scoped subdirectory so sibling workers never collide.
pub fn day_result_dir(result_root: impl AsRef<Path>, day: &Day) -> PathBuf {
    result_root.as_ref().to_path_buf().then_day(day)
}
