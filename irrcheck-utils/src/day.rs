//! The `YYYY-MM-DD` unit the pipeline fans out over.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Day {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl Day {
    pub fn new(year: u32, month: u32, day: u32) -> Self {
        Day { year, month, day }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl PartialOrd for Day {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Day {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.day).cmp(&(other.year, other.month, other.day))
    }
}

impl FromStr for Day {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() != 3 {
            return Err(format!("not a YYYY-MM-DD day: {s:?}"));
        }
        let year = parts[0].parse().map_err(|_| format!("bad year in {s:?}"))?;
        let month = parts[1].parse().map_err(|_| format!("bad month in {s:?}"))?;
        let day = parts[2].parse().map_err(|_| format!("bad day in {s:?}"))?;
        Ok(Day { year, month, day })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let d = Day::new(2015, 4, 1);
        assert_eq!(d.to_string(), "2015-04-01");
        assert_eq!(d.to_string().parse::<Day>().unwrap(), d);
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Day::new(2015, 3, 31);
        let b = Day::new(2015, 4, 1);
        assert!(a < b);
    }
}
