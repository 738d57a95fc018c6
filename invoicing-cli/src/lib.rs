//! Command-line front end for the invoicing tax engine.

pub mod app;
pub mod config;
pub mod logging;
pub mod recalculate;
