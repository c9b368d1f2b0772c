// src/model/mod.rs

pub mod form;
pub mod period;
pub mod row;
pub mod selection;
pub mod state;

pub use form::{FormKind, Subset};
pub use period::Period;
pub use row::{CanonicalRow, ResultTable, COLUMNS};
pub use selection::Selection;
pub use state::StateCode;
