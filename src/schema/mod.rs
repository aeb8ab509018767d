//! Schema module - Grid, configuration and reporting types for route evolution.

mod config;
mod evolution;
mod grid;

pub use config::*;
pub use evolution::*;
pub use grid::*;
