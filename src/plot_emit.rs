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
//! Plot emission. A narrow trait abstracting "emit a dated (x, y)/(x, y, z)
//! series," so no checker or evaluator code touches a plotting library
//! directly. Builds `plotly::Plot`/`Scatter` line traces over a date axis.

use std::collections::BTreeMap;
use std::path::Path;

use plotly::common::Mode;
use plotly::{Plot, Scatter};

use irrcheck_utils::Day;

/// One named series plotted against a day axis.
pub trait LinePlotEmitter {
    /// Adds a line trace named `name` through `points` (already sorted by
    /// day) to this plot.
    fn add_series(&mut self, name: &str, points: &[(Day, f64)]);

    /// Writes the accumulated traces to `path` as a self-contained HTML file.
    fn write(&mut self, path: &Path);
}

/// `plotly`-backed `LinePlotEmitter`.
pub struct PlotlyLineEmitter {
    plot: Plot,
}

impl Default for PlotlyLineEmitter {
    fn default() -> Self {
        PlotlyLineEmitter { plot: Plot::new() }
    }
}

impl LinePlotEmitter for PlotlyLineEmitter {
    fn add_series(&mut self, name: &str, points: &[(Day, f64)]) {
        let x: Vec<String> = points.iter().map(|(d, _)| d.to_string()).collect();
        let y: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let trace = Scatter::new(x, y).mode(Mode::Lines).name(name);
        self.plot.add_trace(trace);
    }

    fn write(&mut self, path: &Path) {
        self.plot.write_html(path.to_string_lossy().to_string());
    }
}

/// One day's route-directory summary, the raw material for the series
/// below.
pub struct DaySummary {
    pub day: Day,
    /// `prefix_len -> (route-object count, avg AS-path length of passing routes)`
    pub by_prefix_len: BTreeMap<u8, (usize, f64)>,
    /// `rir -> prefix count`
    pub by_rir: BTreeMap<String, usize>,
    /// `hop error code -> occurrence count`
    pub hop_codes: BTreeMap<i32, usize>,
}

/// Average path length per prefix length, over time: one series per
/// observed prefix length.
pub fn plot_avg_pathlen_per_prefixlen(summaries: &[DaySummary], out_dir: &Path, emitter: &mut impl LinePlotEmitter) {
    let mut series: BTreeMap<u8, Vec<(Day, f64)>> = BTreeMap::new();
    for day in summaries {
        for (&len, &(_, avg)) in &day.by_prefix_len {
            series.entry(len).or_default().push((day.day, avg));
        }
    }
    for (len, points) in &series {
        emitter.add_series(&format!("/{len}"), points);
    }
    emitter.write(&out_dir.join("avg_pathlen_per_prefixlen.html"));
}

/// Route-object count per prefix length, over time.
pub fn plot_prefixcount_per_prefixlen(summaries: &[DaySummary], out_dir: &Path, emitter: &mut impl LinePlotEmitter) {
    let mut series: BTreeMap<u8, Vec<(Day, f64)>> = BTreeMap::new();
    for day in summaries {
        for (&len, &(count, _)) in &day.by_prefix_len {
            series.entry(len).or_default().push((day.day, count as f64));
        }
    }
    for (len, points) in &series {
        emitter.add_series(&format!("/{len}"), points);
    }
    emitter.write(&out_dir.join("prefixcount_per_prefixlen.html"));
}

/// Prefix counts per RIR, over time.
pub fn plot_prefixcount_per_rir(summaries: &[DaySummary], out_dir: &Path, emitter: &mut impl LinePlotEmitter) {
    let mut series: BTreeMap<String, Vec<(Day, f64)>> = BTreeMap::new();
    for day in summaries {
        for (rir, &count) in &day.by_rir {
            series.entry(rir.clone()).or_default().push((day.day, count as f64));
        }
    }
    for (rir, points) in &series {
        emitter.add_series(rir, points);
    }
    emitter.write(&out_dir.join("prefixcount_per_rir.html"));
}

/// Per-hop error-code distribution, over time.
pub fn plot_hop_code_distribution(summaries: &[DaySummary], out_dir: &Path, emitter: &mut impl LinePlotEmitter) {
    let mut series: BTreeMap<i32, Vec<(Day, f64)>> = BTreeMap::new();
    for day in summaries {
        for (&code, &count) in &day.hop_codes {
            series.entry(code).or_default().push((day.day, count as f64));
        }
    }
    for (code, points) in &series {
        emitter.add_series(&code.to_string(), points);
    }
    emitter.write(&out_dir.join("hop_code_distribution.html"));
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct RecordingEmitter {
        series: Vec<(String, Vec<(Day, f64)>)>,
        written: Option<std::path::PathBuf>,
    }

    impl LinePlotEmitter for RecordingEmitter {
        fn add_series(&mut self, name: &str, points: &[(Day, f64)]) {
            self.series.push((name.to_string(), points.to_vec()));
        }

        fn write(&mut self, path: &Path) {
            self.written = Some(path.to_path_buf());
        }
    }

    fn summary(day: Day) -> DaySummary {
        let mut by_prefix_len = BTreeMap::new();
        by_prefix_len.insert(24, (10, 3.5));
        let mut by_rir = BTreeMap::new();
        by_rir.insert("RIPE NCC".to_string(), 10);
        let mut hop_codes = BTreeMap::new();
        hop_codes.insert(0, 8);
        hop_codes.insert(305, 2);
        DaySummary { day, by_prefix_len, by_rir, hop_codes }
    }

    #[test]
    fn avg_pathlen_emits_one_series_per_prefix_len() {
        let summaries = vec![summary(Day::new(2024, 1, 1)), summary(Day::new(2024, 1, 2))];
        let mut emitter = RecordingEmitter::default();
        plot_avg_pathlen_per_prefixlen(&summaries, Path::new("/tmp"), &mut emitter);
        assert_eq!(emitter.series.len(), 1);
        assert_eq!(emitter.series[0].0, "/24");
        assert_eq!(emitter.series[0].1.len(), 2);
        assert!(emitter.written.is_some());
    }

    #[test]
    fn hop_code_distribution_groups_by_code() {
        let summaries = vec![summary(Day::new(2024, 1, 1))];
        let mut emitter = RecordingEmitter::default();
        plot_hop_code_distribution(&summaries, Path::new("/tmp"), &mut emitter);
        assert_eq!(emitter.series.len(), 2);
    }
}
