// src/model/form.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::Period;

/// The EIA forms this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormKind {
    /// Monthly generator inventory.
    #[serde(rename = "860m")]
    F860m,
    /// Annual small-scale solar capacity and generation by state.
    #[serde(rename = "861")]
    F861,
    /// Monthly small-scale solar capacity and generation by state.
    #[serde(rename = "861m")]
    F861m,
}

impl FormKind {
    pub const ALL: [FormKind; 3] = [FormKind::F860m, FormKind::F861, FormKind::F861m];

    pub fn id(self) -> &'static str {
        match self {
            FormKind::F860m => "860m",
            FormKind::F861 => "861",
            FormKind::F861m => "861m",
        }
    }

    /// Monthly forms key their rows by year and month, annual ones by year.
    pub fn is_monthly(self) -> bool {
        !matches!(self, FormKind::F861)
    }

    /// Earliest period EIA has published for the form.
    pub fn first_period(self) -> Period {
        match self {
            FormKind::F860m => Period { year: 2015, month: Some(7) },
            FormKind::F861m => Period { year: 2017, month: Some(1) },
            FormKind::F861 => Period::annual(2017),
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        let id = id.strip_prefix("form").unwrap_or(&id);
        FormKind::ALL
            .into_iter()
            .find(|f| f.id() == id)
            .ok_or_else(|| format!("unknown form '{s}' (expected 860m, 861 or 861m)"))
    }
}

/// Sheets of the 860m workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Subset {
    #[default]
    Operating,
    Planned,
    Retired,
    CanceledOrPostponed,
    OperatingPr,
    PlannedPr,
    RetiredPr,
}

impl Subset {
    pub const ALL: [Subset; 7] = [
        Subset::Operating,
        Subset::Planned,
        Subset::Retired,
        Subset::CanceledOrPostponed,
        Subset::OperatingPr,
        Subset::PlannedPr,
        Subset::RetiredPr,
    ];

    /// Sheet name inside the workbook.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Subset::Operating => "Operating",
            Subset::Planned => "Planned",
            Subset::Retired => "Retired",
            Subset::CanceledOrPostponed => "Canceled or Postponed",
            Subset::OperatingPr => "Operating_PR",
            Subset::PlannedPr => "Planned_PR",
            Subset::RetiredPr => "Retired_PR",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

impl FromStr for Subset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Subset::ALL
            .into_iter()
            .find(|sub| {
                let name: String = sub
                    .sheet_name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                name.eq_ignore_ascii_case(&key) || (key == "canceled" && *sub == Subset::CanceledOrPostponed)
            })
            .ok_or_else(|| format!("unknown subset '{s}'"))
    }
}
