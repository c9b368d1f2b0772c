// src/aggregate.rs
//! Selection filter, table ordering and the optional per-state sums.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::{
    error::{Error, Result},
    model::{state::NATIONAL, CanonicalRow, FormKind, Period, ResultTable, Selection, StateCode},
    normalize::{coerce, CAPACITY_UNIT, TOTAL_SECTOR},
    parse::ParsedTable,
    sheet::{Cell, Rows},
};

/// How rows are combined after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Every matching entity row, untouched.
    #[default]
    Rows,
    /// Capacity and production summed per (period, state). Rows of the
    /// all-sector total are left out of the sum, being sums already.
    ByState,
}

/// Keeps the rows the selection names, then orders them by
/// (period, state, entity_id). A repeated (entity_id, period) pair means the
/// source is inconsistent and fails the whole table.
pub fn apply(
    rows: Vec<CanonicalRow>,
    selection: &Selection,
    aggregation: Aggregation,
) -> Result<ResultTable> {
    let total = rows.len();
    let kept: Vec<CanonicalRow> = rows
        .into_iter()
        .filter(|r| selection.contains_period(&r.period) && selection.contains_state(r.state.as_ref()))
        .collect();

    let mut seen = HashSet::with_capacity(kept.len());
    for row in &kept {
        if !seen.insert((row.entity_id.as_str(), row.period)) {
            return Err(Error::malformed(
                format!("{} {}", row.entity_id, row.period),
                "duplicate (entity_id, period) row",
            ));
        }
    }

    let mut out = match aggregation {
        Aggregation::Rows => kept,
        Aggregation::ByState => sum_by_state(kept),
    };
    out.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    debug!(input = total, output = out.len(), ?aggregation, "applied selection");
    Ok(ResultTable::from_sorted(out))
}

/// Drops the source rows of `table` that fall outside `selection`, reading
/// the period and state straight from the published cells. A 860m file is
/// already one month, so only its `Plant State` is checked. Cells that do
/// not parse never match a filter.
pub fn retain_raw(table: &mut ParsedTable, selection: &Selection) {
    let total = table.rows.len();
    let columns = match table.form {
        FormKind::F860m => RawColumns {
            year: None,
            month: None,
            state: table.column("Plant State"),
        },
        FormKind::F861 | FormKind::F861m => RawColumns {
            year: table.column("year"),
            month: table.column("month"),
            state: table.column("state"),
        },
    };

    let rows = std::mem::take(&mut table.rows);
    let kept: Rows = rows
        .into_iter()
        .filter(|row| columns.matches(table, row, selection))
        .collect();
    table.rows = kept;
    debug!(url = %table.location.url, input = total, output = table.rows.len(), "applied selection to raw rows");
}

struct RawColumns {
    year: Option<usize>,
    month: Option<usize>,
    state: Option<usize>,
}

impl RawColumns {
    fn matches(&self, table: &ParsedTable, row: &[Cell], selection: &Selection) -> bool {
        if let Some(i) = self.year {
            let year = coerce::integer("year", table.cell(row, i)).ok();
            if !year.is_some_and(|y| selection.years().iter().any(|&s| i64::from(s) == y)) {
                return false;
            }
        }
        if let (Some(i), Some(months)) = (self.month, selection.months()) {
            let month = coerce::integer("month", table.cell(row, i)).ok();
            if !month.is_some_and(|m| months.iter().any(|&s| i64::from(s) == m)) {
                return false;
            }
        }
        if let (Some(i), Some(_)) = (self.state, selection.states()) {
            return match coerce::state("state", table.cell(row, i)) {
                Ok(state) => selection.contains_state(state.as_ref()),
                Err(_) => false,
            };
        }
        true
    }
}

#[derive(Default)]
struct StateSum {
    capacity: Option<f64>,
    production: Option<f64>,
    technology: Option<Option<String>>,
}

fn add(acc: &mut Option<f64>, value: Option<f64>) {
    if let Some(v) = value {
        *acc = Some(acc.unwrap_or(0.0) + v);
    }
}

fn sum_by_state(rows: Vec<CanonicalRow>) -> Vec<CanonicalRow> {
    let mut groups: BTreeMap<(Period, Option<StateCode>), StateSum> = BTreeMap::new();
    for row in rows {
        if row.sector.as_deref() == Some(TOTAL_SECTOR) {
            continue;
        }
        let sum = groups.entry((row.period, row.state)).or_default();
        add(&mut sum.capacity, row.capacity_value);
        add(&mut sum.production, row.production_value);
        // a group keeps its technology only while every member agrees
        sum.technology = match sum.technology.take() {
            None => Some(row.technology),
            Some(t) if t == row.technology => Some(t),
            Some(_) => Some(None),
        };
    }

    groups
        .into_iter()
        .map(|((period, state), sum)| CanonicalRow {
            entity_id: state.map_or_else(|| NATIONAL.to_string(), |s| s.to_string()),
            period,
            state,
            sector: None,
            technology: sum.technology.flatten(),
            capacity_value: sum.capacity,
            production_value: sum.production,
            unit: CAPACITY_UNIT.to_string(),
        })
        .collect()
}
