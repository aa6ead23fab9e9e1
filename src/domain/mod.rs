//! Core domain types and the analysis engine. Pure and synchronous; no I/O.

pub mod quarter;
pub mod snapshot;
pub mod error;
pub mod config;
pub mod config_validation;
pub mod aligner;
pub mod diff;
pub mod signals;
pub mod portfolio_signals;
pub mod starter;
pub mod cluster;
pub mod analysis;
pub mod universe;
