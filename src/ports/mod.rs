//! Collaborator traits consumed by the engine and the CLI.

pub mod cluster_port;
pub mod config_port;
pub mod report_port;
pub mod snapshot_port;
