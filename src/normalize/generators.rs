// src/normalize/generators.rs

use rayon::prelude::*;

use super::{coerce, required_column, CAPACITY_UNIT};
use crate::{
    error::Result,
    model::CanonicalRow,
    parse::ParsedTable,
    sheet::Cell,
};

struct Columns {
    plant: usize,
    generator: usize,
    state: usize,
    technology: usize,
    capacity: usize,
    sector: Option<usize>,
}

pub(super) fn normalize(table: &ParsedTable) -> Result<Vec<CanonicalRow>> {
    let cols = Columns {
        plant: required_column(table, "Plant ID")?,
        generator: required_column(table, "Generator ID")?,
        state: required_column(table, "Plant State")?,
        technology: required_column(table, "Technology")?,
        capacity: required_column(table, "Nameplate Capacity (MW)")?,
        sector: table.column("Sector"),
    };

    // inventories run to tens of thousands of generators
    table
        .rows
        .par_iter()
        .map(|row| generator_row(table, &cols, row))
        .collect()
}

fn generator_row(table: &ParsedTable, cols: &Columns, row: &[Cell]) -> Result<CanonicalRow> {
    let plant = coerce::integer("Plant ID", table.cell(row, cols.plant))?;
    let generator = table.cell(row, cols.generator).text();
    Ok(CanonicalRow {
        entity_id: format!("{plant}-{generator}"),
        period: table.location.period,
        state: coerce::state("Plant State", table.cell(row, cols.state))?,
        sector: cols.sector.and_then(|i| coerce::text(table.cell(row, i))),
        technology: coerce::text(table.cell(row, cols.technology)),
        capacity_value: coerce::quantity("Nameplate Capacity (MW)", table.cell(row, cols.capacity))?,
        production_value: None,
        unit: CAPACITY_UNIT.to_string(),
    })
}
