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
//! Library for auditing RIPE-routed BGP announcements against their IRR
//! route and route-policy (`aut-num`) objects.

pub mod bgp_table;
pub mod iana;
pub mod path_check;
pub mod pipeline;
pub mod plot_emit;
pub mod report;
pub mod route_check;
pub mod rpsl;
pub mod util;

pub mod prelude {
    pub use super::{
        iana::IanaDirectory,
        path_check::{check_path, PathCheckDirs, PathCheckResult},
        pipeline::{preprocess_day, process_day, DailyArtifacts, DayCheckResult},
        route_check::{check_route, RouteCheckCode, RouteCheckResult},
    };
    pub use irrcheck_utils::{Day, Prefix};
}
