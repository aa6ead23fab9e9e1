//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;
pub mod keyword_cluster_adapter;
pub mod map_cluster_adapter;
