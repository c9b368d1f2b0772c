// src/locate.rs
//
// Maps (form, year, month) to the published workbook holding it.

use chrono::Month;
use std::fmt;
use url::Url;

use crate::{
    error::{Error, Result},
    model::{FormKind, Period},
};

/// One published file. `period` is the coverage of the file: a month for
/// 860m, a whole year for the small-scale solar workbooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub form: FormKind,
    pub period: Period,
    pub url: Url,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SourceLocator {
    base_url: Url,
    current_year: i32,
}

impl SourceLocator {
    pub fn new(mut base_url: Url, current_year: i32) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        SourceLocator {
            base_url,
            current_year,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Locations holding `(form, year, month)`. Monthly forms need a month,
    /// the annual form must not get one.
    pub fn locate(&self, form: FormKind, year: i32, month: Option<u32>) -> Result<Vec<Location>> {
        let path = match (form, month) {
            (FormKind::F861, Some(m)) => {
                return Err(Error::invalid(format!(
                    "form {form} is annual; got month {m}"
                )))
            }
            (FormKind::F860m | FormKind::F861m, None) => {
                return Err(Error::invalid(format!("form {form} requires a month")))
            }
            (FormKind::F860m, Some(m)) => {
                let name = month_name(m)
                    .ok_or_else(|| Error::invalid(format!("month {m} is not in 1..=12")))?;
                format!("eia860m/archive/xls/{name}_generator{year}.xlsx")
            }
            (FormKind::F861m, Some(m)) if !(1..=12).contains(&m) => {
                return Err(Error::invalid(format!("month {m} is not in 1..=12")))
            }
            (FormKind::F861 | FormKind::F861m, _) => {
                let dir = if year < self.current_year {
                    "eia861m/archive/xls"
                } else {
                    "eia861m/xls"
                };
                format!("{dir}/small_scale_solar_{year}.xlsx")
            }
        };

        let period = match (form, month) {
            (FormKind::F860m, Some(m)) => Period::monthly(year, m)
                .ok_or_else(|| Error::invalid(format!("month {m} is not in 1..=12")))?,
            _ => Period::annual(year),
        };
        Ok(vec![Location {
            form,
            period,
            url: self.join(&path)?,
        }])
    }

    /// The EIA page listing every published file of `form`.
    pub fn landing_page(&self, form: FormKind) -> Result<Url> {
        match form {
            FormKind::F860m => self.join("eia860m/"),
            FormKind::F861 | FormKind::F861m => self.join("eia861m/"),
        }
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("cannot join {path} onto {}: {e}", self.base_url)))
    }
}

/// Lowercase English month name, as used in 860m file names.
fn month_name(month: u32) -> Option<String> {
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    Some(month.name().to_ascii_lowercase())
}
