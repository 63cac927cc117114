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
//! RPSL object parsing, the expression model and the filter/rule
//! evaluators: C4, C6, C7, C8, C9.

pub mod directory;
pub mod expr;
pub mod filter;
pub mod matcher;
pub mod objects;
pub mod parse;

pub use directory::{enrich_member_of, HashDirectory, Keyed, RouteDirectory};
pub use expr::{Afi, Factor, ParsedRule};
pub use filter::Dirs as FilterDirs;
pub use matcher::{match_rules, MatchDirs, MatchOutcome};
pub use objects::{
    AsSetObject, AutNumObject, AutNumRule, FilterSetObject, ObjectError, PeeringSetObject,
    RouteObject, RouteSetObject,
};
pub use parse::{parse_ripe_file, RpslObjectText};
