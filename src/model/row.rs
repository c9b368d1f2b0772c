// src/model/row.rs

use serde::{Deserialize, Serialize};

use super::{Period, StateCode};

/// Canonical column order, shared by every exporter.
pub const COLUMNS: [&str; 8] = [
    "entity_id",
    "period",
    "state",
    "sector",
    "technology",
    "capacity_value",
    "production_value",
    "unit",
];

/// One normalized observation.
///
/// `capacity_value` is in `unit` (MW for every current form) and
/// `production_value` in MWh. `None` marks a missing value; it is never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub entity_id: String,
    pub period: Period,
    pub state: Option<StateCode>,
    pub sector: Option<String>,
    pub technology: Option<String>,
    pub capacity_value: Option<f64>,
    pub production_value: Option<f64>,
    pub unit: String,
}

impl CanonicalRow {
    /// Sort key of a result table.
    pub fn order_key(&self) -> (Period, Option<StateCode>, &str) {
        (self.period, self.state, &self.entity_id)
    }
}

/// Rows of one query, sorted by (period, state, entity_id).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<CanonicalRow>,
}

impl ResultTable {
    /// Wraps rows that are already in table order.
    pub(crate) fn from_sorted(rows: Vec<CanonicalRow>) -> Self {
        ResultTable { rows }
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<CanonicalRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
