use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KhlError;

/// A KHL season, labeled "YYYY/YYYY" and identified by its ending year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Season {
    end_year: u16,
}

impl Season {
    pub fn from_end_year(end_year: u16) -> Self {
        Self {
            end_year: end_year.max(1),
        }
    }

    pub fn start_year(&self) -> u16 {
        self.end_year - 1
    }

    pub fn end_year(&self) -> u16 {
        self.end_year
    }

    /// The season in progress (or most recently finished) on `date`.
    ///
    /// Seasons start in late summer, so from July on the season ends next year.
    pub fn containing(date: NaiveDate) -> Self {
        let year = date.year() as u16;
        if date.month() >= 7 {
            Self::from_end_year(year + 1)
        } else {
            Self::from_end_year(year)
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }
}

fn parse_year(text: &str) -> Option<u16> {
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|y| *y > 0)
}

impl FromStr for Season {
    type Err = KhlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KhlError::InvalidSeason(s.to_string());
        let s_trim = s.trim();
        match s_trim.split_once('/') {
            Some((start, end)) => {
                let start = parse_year(start.trim()).ok_or_else(invalid)?;
                let end = parse_year(end.trim()).ok_or_else(invalid)?;
                if end != start + 1 {
                    return Err(invalid());
                }
                Ok(Self::from_end_year(end))
            }
            None => parse_year(s_trim)
                .filter(|y| *y > 1)
                .map(Self::from_end_year)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_year(), self.end_year)
    }
}

impl Serialize for Season {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Season {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Which statistics table of a season to read.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    #[default]
    Regular,
    Playoffs,
}

impl Mode {
    /// Interpret a `playoff=` query flag; only `1`, `true` and `yes` select playoffs.
    pub fn from_flag(flag: &str) -> Self {
        match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Mode::Playoffs,
            _ => Mode::Regular,
        }
    }

    pub fn is_playoffs(&self) -> bool {
        matches!(self, Mode::Playoffs)
    }

    /// Tournament code used in the source site's URLs.
    pub fn code(&self) -> u16 {
        match self {
            Mode::Regular => 312,
            Mode::Playoffs => 315,
        }
    }
}

/// Cache key: one statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeasonKey {
    pub season: Season,
    pub mode: Mode,
}

impl SeasonKey {
    pub fn new(season: Season, mode: Mode) -> Self {
        Self { season, mode }
    }

    /// File name of this key's snapshot, e.g. `2023-2024_regular.json`.
    pub fn snapshot_file_name(&self) -> String {
        format!(
            "{}-{}_{}.json",
            self.season.start_year(),
            self.season.end_year(),
            self.mode
        )
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.mode)
    }
}
