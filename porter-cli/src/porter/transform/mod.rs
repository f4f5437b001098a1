//! Row transformation

mod apply;

pub use apply::{MappedRow, apply_mapping, check_columns, passthrough};
