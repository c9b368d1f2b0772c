// src/lib.rs
//! Retrieval and normalization of EIA Form 860m, 861 and 861m data.
//!
//! Every form is read through the same pipeline:
//!
//! ```text
//! locate -> fetch (+ cache) -> parse -> normalize -> filter/aggregate -> export
//! ```
//!
//! and comes out as a [`ResultTable`] of [`CanonicalRow`]s sorted by
//! (period, state, entity_id).
//!
//! ```no_run
//! # async fn demo() -> eia_forms::Result<()> {
//! use eia_forms::{Config, Form861m, Pipeline};
//!
//! let pipeline = Pipeline::new(&Config::default())?;
//! let solar = Form861m::new(&pipeline, &[2020], &[8], Some(&["CA", "WA"][..])).await?;
//! print!("{solar}");
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod forms;
pub mod locate;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod sheet;

pub use aggregate::Aggregation;
pub use config::Config;
pub use error::{Error, FetchCause, Result};
pub use forms::{Form860m, Form861, Form861m};
pub use model::{CanonicalRow, FormKind, Period, ResultTable, Selection, StateCode, Subset};
pub use pipeline::{Pipeline, Query};
