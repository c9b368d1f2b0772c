// src/forms.rs
//! One type per form. Construction validates the selection, runs the whole
//! pipeline eagerly and keeps the result; `Display` renders it as CSV.

use std::fmt;

use crate::{
    error::Result,
    export,
    model::{CanonicalRow, FormKind, ResultTable, Selection, Subset},
    pipeline::{Pipeline, Query},
};

fn selection(years: &[i32], months: Option<&[u32]>, states: Option<&[&str]>) -> Result<Selection> {
    let mut sel = Selection::new(years.iter().copied());
    if let Some(months) = months {
        sel = sel.with_months(months.iter().copied());
    }
    match states {
        Some(states) => sel.with_state_names(states.iter().copied()),
        None => Ok(sel),
    }
}

macro_rules! form_table {
    ($name:ident, $form:expr) => {
        impl $name {
            pub const FORM: FormKind = $form;

            /// Runs the pipeline for an already-built selection.
            pub async fn from_selection(pipeline: &Pipeline, selection: Selection) -> Result<Self> {
                Self::run(pipeline, Query::new($form, selection)).await
            }

            async fn run(pipeline: &Pipeline, query: Query) -> Result<Self> {
                let table = pipeline.run(&query).await?;
                Ok($name {
                    selection: query.selection,
                    table,
                })
            }

            pub fn rows(&self) -> &[CanonicalRow] {
                export::to_rows(&self.table)
            }

            pub fn table(&self) -> &ResultTable {
                &self.table
            }

            pub fn into_table(self) -> ResultTable {
                self.table
            }

            pub fn selection(&self) -> &Selection {
                &self.selection
            }

            pub fn to_csv(&self) -> Result<String> {
                export::to_csv(&self.table)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let csv = export::to_csv(&self.table).map_err(|_| fmt::Error)?;
                f.write_str(&csv)
            }
        }
    };
}

/// Annual small-scale solar capacity and generation by state and sector.
#[derive(Debug, Clone)]
pub struct Form861 {
    selection: Selection,
    table: ResultTable,
}

impl Form861 {
    pub async fn new(pipeline: &Pipeline, years: &[i32], states: Option<&[&str]>) -> Result<Self> {
        Self::from_selection(pipeline, selection(years, None, states)?).await
    }
}

form_table!(Form861, FormKind::F861);

/// Monthly small-scale solar capacity and generation by state and sector.
#[derive(Debug, Clone)]
pub struct Form861m {
    selection: Selection,
    table: ResultTable,
}

impl Form861m {
    pub async fn new(
        pipeline: &Pipeline,
        years: &[i32],
        months: &[u32],
        states: Option<&[&str]>,
    ) -> Result<Self> {
        Self::from_selection(pipeline, selection(years, Some(months), states)?).await
    }
}

form_table!(Form861m, FormKind::F861m);

/// Monthly generator inventory, one row per generator.
#[derive(Debug, Clone)]
pub struct Form860m {
    selection: Selection,
    table: ResultTable,
}

impl Form860m {
    /// Operating generators.
    pub async fn new(
        pipeline: &Pipeline,
        years: &[i32],
        months: &[u32],
        states: Option<&[&str]>,
    ) -> Result<Self> {
        Self::with_subset(pipeline, years, months, states, Subset::Operating).await
    }

    pub async fn with_subset(
        pipeline: &Pipeline,
        years: &[i32],
        months: &[u32],
        states: Option<&[&str]>,
        subset: Subset,
    ) -> Result<Self> {
        let sel = selection(years, Some(months), states)?;
        Self::run(pipeline, Query::new(FormKind::F860m, sel).with_subset(subset)).await
    }
}

form_table!(Form860m, FormKind::F860m);
