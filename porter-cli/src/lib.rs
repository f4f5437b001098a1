//! Forum database porter
//!
//! Exports a source forum schema into the porter interchange format through
//! per-platform plans of SQL queries and column mappings.

pub mod cli;
pub mod config;
pub mod platforms;
pub mod porter;
