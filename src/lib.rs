//! fundlens: quarterly 13F holdings analysis engine.
//!
//! Hexagonal architecture: the engine lives in [`domain`], collaborator
//! traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
