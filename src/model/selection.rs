// src/model/selection.rs

use std::collections::BTreeSet;

use super::{FormKind, Period, StateCode};
use crate::error::{Error, Result};

/// What the caller asked for: years, optionally months and states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    years: BTreeSet<i32>,
    months: Option<BTreeSet<u32>>,
    states: Option<BTreeSet<StateCode>>,
}

impl Selection {
    pub fn new(years: impl IntoIterator<Item = i32>) -> Self {
        Selection {
            years: years.into_iter().collect(),
            months: None,
            states: None,
        }
    }

    pub fn with_months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.months = Some(months.into_iter().collect());
        self
    }

    pub fn with_states(mut self, states: impl IntoIterator<Item = StateCode>) -> Self {
        self.states = Some(states.into_iter().collect());
        self
    }

    /// Parses state codes, failing on the first unknown one.
    pub fn with_state_names<S: AsRef<str>>(
        self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let states = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                StateCode::parse(name)
                    .ok_or_else(|| Error::invalid(format!("unknown state code '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_states(states))
    }

    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn months(&self) -> Option<&BTreeSet<u32>> {
        self.months.as_ref()
    }

    pub fn states(&self) -> Option<&BTreeSet<StateCode>> {
        self.states.as_ref()
    }

    /// Checks the selection against the form's granularity and publication
    /// range. Runs before any I/O.
    pub fn validate(&self, form: FormKind, current_year: i32) -> Result<()> {
        if self.years.is_empty() {
            return Err(Error::invalid("at least one year is required"));
        }
        let first = form.first_period();
        if let Some(&year) = self
            .years
            .iter()
            .find(|&&y| y < first.year || y > current_year)
        {
            return Err(Error::invalid(format!(
                "year {year} is outside {}..={current_year} for form {form}",
                first.year
            )));
        }

        match (&self.months, form.is_monthly()) {
            (Some(_), false) => {
                return Err(Error::invalid(format!(
                    "form {form} is annual and does not accept months"
                )))
            }
            (None, true) => {
                return Err(Error::invalid(format!("form {form} requires a month")))
            }
            (Some(months), true) => {
                if months.is_empty() {
                    return Err(Error::invalid(format!("form {form} requires a month")));
                }
                if let Some(m) = months.iter().find(|m| !(1..=12).contains(*m)) {
                    return Err(Error::invalid(format!("month {m} is not in 1..=12")));
                }
                if let Some(p) = self.periods().into_iter().find(|p| *p < first) {
                    return Err(Error::invalid(format!(
                        "form {form} is not published before {first} (asked for {p})"
                    )));
                }
            }
            (None, false) => {}
        }

        if matches!(&self.states, Some(states) if states.is_empty()) {
            return Err(Error::invalid("state filter is empty"));
        }
        Ok(())
    }

    /// Every period the selection names, in order.
    pub fn periods(&self) -> Vec<Period> {
        match &self.months {
            None => self.years.iter().map(|&y| Period::annual(y)).collect(),
            Some(months) => self
                .years
                .iter()
                .flat_map(|&y| months.iter().filter_map(move |&m| Period::monthly(y, m)))
                .collect(),
        }
    }

    pub fn contains_period(&self, period: &Period) -> bool {
        if !self.years.contains(&period.year) {
            return false;
        }
        match (&self.months, period.month) {
            (None, _) => true,
            (Some(months), Some(m)) => months.contains(&m),
            (Some(_), None) => false,
        }
    }

    /// National rows (`None`) only pass when no state filter is set.
    pub fn contains_state(&self, state: Option<&StateCode>) -> bool {
        match (&self.states, state) {
            (None, _) => true,
            (Some(states), Some(s)) => states.contains(s),
            (Some(_), None) => false,
        }
    }
}
