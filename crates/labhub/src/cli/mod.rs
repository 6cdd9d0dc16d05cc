//! CLI command implementations

pub mod check;
pub mod config;
pub mod error;
pub mod index;
pub mod output;
pub mod renumber;
