//! Export core: types, source store, destination writers and the engine

pub mod conversations;
pub mod engine;
pub mod error;
pub mod output;
pub mod runner;
pub mod source;
pub mod transform;
pub mod types;

pub use engine::{ExportEngine, ExportSession, ExportSummary, TableOutcome, TableReport};
pub use error::ExportError;
pub use runner::{RunOptions, run_plan};
pub use types::*;
