// src/normalize/solar.rs
//
// Small-scale solar: each sheet row carries capacity and generation for four
// sectors, which become four canonical rows.

use std::collections::BTreeMap;

use super::{coerce, required_column, CAPACITY_UNIT};
use crate::{
    error::{Error, Result},
    model::{state::NATIONAL, CanonicalRow, Period},
    parse::ParsedTable,
};

pub const TECHNOLOGY: &str = "Solar Photovoltaic";

/// (entity suffix, sector name, capacity column, generation column)
const SECTORS: [(&str, &str, &str, &str); 4] = [
    ("RES", "residential", "res_mw", "res_mwh"),
    ("COM", "commercial", "com_mw", "com_mwh"),
    ("IND", "industrial", "ind_mw", "ind_mwh"),
    ("TOT", "total", "tot_mw", "tot_mwh"),
];

/// Sector name of the all-sector rows, which are themselves sums.
pub const TOTAL_SECTOR: &str = "total";

/// One row per (state, sector, month). Only months of the file's year are
/// kept, so overlapping workbooks never yield the same row twice.
pub(super) fn monthly(table: &ParsedTable) -> Result<Vec<CanonicalRow>> {
    let year_col = required_column(table, "year")?;
    let month_col = required_column(table, "month")?;
    let state_col = required_column(table, "state")?;
    let sectors = SECTORS
        .iter()
        .map(|&(code, name, mw, mwh)| {
            Ok((code, name, required_column(table, mw)?, required_column(table, mwh)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let wanted_year = table.location.period.year;
    let mut out = Vec::with_capacity(table.rows.len() * sectors.len());
    for row in &table.rows {
        let year = coerce::integer("year", table.cell(row, year_col))?;
        if year != i64::from(wanted_year) {
            continue;
        }
        let month = coerce::integer("month", table.cell(row, month_col))?;
        let period = u32::try_from(month)
            .ok()
            .and_then(|m| Period::monthly(wanted_year, m))
            .ok_or_else(|| Error::normalization("month", month.to_string(), "not in 1..=12"))?;
        let state = coerce::state("state", table.cell(row, state_col))?;
        let prefix = state.as_ref().map_or(NATIONAL, |s| s.as_str());

        for &(code, name, mw, mwh) in &sectors {
            out.push(CanonicalRow {
                entity_id: format!("{prefix}-{code}"),
                period,
                state,
                sector: Some(name.to_string()),
                technology: Some(TECHNOLOGY.to_string()),
                capacity_value: coerce::quantity(&table.headers[mw], table.cell(row, mw))?,
                production_value: coerce::quantity(&table.headers[mwh], table.cell(row, mwh))?,
                unit: CAPACITY_UNIT.to_string(),
            });
        }
    }
    Ok(out)
}

/// Annual roll-up of the monthly rows per entity: capacity is the stock at
/// the latest month that reports one, production the sum of the reported
/// months (missing when no month reports).
pub(super) fn annual(table: &ParsedTable) -> Result<Vec<CanonicalRow>> {
    let mut by_entity: BTreeMap<String, Vec<CanonicalRow>> = BTreeMap::new();
    for row in monthly(table)? {
        by_entity.entry(row.entity_id.clone()).or_default().push(row);
    }

    let year = table.location.period.year;
    let rolled = by_entity
        .into_values()
        .filter_map(|mut months| {
            months.sort_by_key(|r| r.period);
            let capacity = months.iter().rev().find_map(|r| r.capacity_value);
            let production = months
                .iter()
                .filter_map(|r| r.production_value)
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v));
            let mut row = months.pop()?;
            row.period = Period::annual(year);
            row.capacity_value = capacity;
            row.production_value = production;
            Some(row)
        })
        .collect();
    Ok(rolled)
}
