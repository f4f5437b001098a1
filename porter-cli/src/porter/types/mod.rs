//! Core types for forum exports

mod value;
mod filter;
mod mapping;
mod query;
mod table;
mod plan;

pub use value::*;
pub use filter::*;
pub use mapping::*;
pub use query::*;
pub use table::*;
pub use plan::*;
