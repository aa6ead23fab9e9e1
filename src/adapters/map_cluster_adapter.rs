//! Identifier → cluster label map loaded from CSV (`identifier,label`).

use crate::domain::error::EngineError;
use crate::ports::cluster_port::ClusterLookup;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LabelRow {
    identifier: String,
    label: String,
}

pub struct MapClusterAdapter {
    labels: BTreeMap<String, String>,
}

impl MapClusterAdapter {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let parse_err = |reason: String| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| parse_err(e.to_string()))?;

        let mut labels = BTreeMap::new();
        for result in rdr.deserialize::<LabelRow>() {
            let row = result.map_err(|e| parse_err(e.to_string()))?;
            if row.identifier.is_empty() || row.label.is_empty() {
                continue;
            }
            if let Some(previous) = labels.insert(row.identifier.clone(), row.label.clone()) {
                if previous != row.label {
                    return Err(parse_err(format!(
                        "{} mapped to both {} and {}",
                        row.identifier, previous, row.label
                    )));
                }
            }
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl ClusterLookup for MapClusterAdapter {
    fn label_for(&self, identifier: &str, _issuer_label: &str) -> Option<String> {
        self.labels.get(identifier).cloned()
    }
}
