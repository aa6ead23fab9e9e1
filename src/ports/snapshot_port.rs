//! Snapshot source port.

use crate::domain::error::EngineError;
use crate::domain::snapshot::Snapshot;

pub trait SnapshotPort {
    /// A fund's snapshots, oldest quarter first.
    fn load_snapshots(&self, fund_id: &str) -> Result<Vec<Snapshot>, EngineError>;

    fn list_funds(&self) -> Result<Vec<String>, EngineError>;
}
