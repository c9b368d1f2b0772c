// src/model/period.rs

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::error::Error;

/// Temporal key of a row: a year, or a year and month.
///
/// Ordered by year, then month; an annual period sorts before the months of
/// the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn annual(year: i32) -> Self {
        Period { year, month: None }
    }

    /// `None` unless `month` is in 1..=12.
    pub fn monthly(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Period {
            year,
            month: Some(month),
        })
    }

    pub fn is_monthly(&self) -> bool {
        self.month.is_some()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = |reason: &str| Error::normalization("period", s, reason);
        let s = s.trim();
        match s.split_once('-') {
            None => s
                .parse()
                .map(Period::annual)
                .map_err(|_| bad("expected YYYY or YYYY-MM")),
            Some((y, m)) => {
                let year = y.parse().map_err(|_| bad("expected YYYY or YYYY-MM"))?;
                let month = m.parse().map_err(|_| bad("expected YYYY or YYYY-MM"))?;
                Period::monthly(year, month).ok_or_else(|| bad("month out of range"))
            }
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
