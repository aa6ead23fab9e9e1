//! Sector/theme label lookup port.

/// Maps a security to a cluster label. `None` means unmapped; the engine
/// pools those holdings under `Unclassified`.
///
/// Implementations must be pure: the same holding always maps to the same
/// label. `Sync` lets per-fund analyses share one lookup across threads.
pub trait ClusterLookup: Sync {
    fn label_for(&self, identifier: &str, issuer_label: &str) -> Option<String>;
}
