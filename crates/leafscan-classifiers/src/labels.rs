//! Class label tables for the general-purpose gate model

use crate::model_loader::ModelSource;
use leafscan_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Ordered class names of a classifier's output layer
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::config("label set must not be empty"));
        }
        Ok(Self { labels })
    }

    /// Resolve and load a label file. `.json` files are read as an
    /// `{"0": "tench, Tinca tinca", ...}` id-to-label map, anything else as
    /// one label per line.
    pub fn load(source: &ModelSource) -> Result<Self> {
        let path = source.resolve()?;
        let labels = Self::from_file(&path)?;
        info!("Loaded {} gate labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read label file {}: {e}", path.display()))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_id2label_json(&content),
            _ => Self::from_lines(&content),
        }
    }

    /// Parse an id-to-label JSON map. Ids must cover `0..n` exactly.
    pub fn from_id2label_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut by_id = BTreeMap::new();
        for (id, label) in raw {
            let id: usize = id
                .parse()
                .map_err(|_| Error::config(format!("label id '{id}' is not an integer")))?;
            by_id.insert(id, label);
        }

        // Keys are sorted and unique, so any gap leaves the last id past the end
        if let Some(&last) = by_id.keys().next_back() {
            if last + 1 != by_id.len() {
                return Err(Error::config("label ids must be contiguous from 0"));
            }
        }
        let labels = by_id.into_values().collect();
        Self::new(labels)
    }

    /// Parse one label per non-empty line
    pub fn from_lines(text: &str) -> Result<Self> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Full label at an output index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Primary name at an output index: the first comma-separated synonym,
    /// so `"tench, Tinca tinca"` becomes `"tench"`
    pub fn primary_name(&self, index: usize) -> Option<&str> {
        self.get(index)
            .map(|label| label.split(',').next().unwrap_or(label).trim())
    }
}
