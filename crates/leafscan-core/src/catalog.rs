//! Disease label table and treatment catalog
//!
//! The catalog is the ordered list of classes the disease model was trained
//! on, each with optional treatment advice. The order is part of the model
//! contract: entry N names output index N. A copy matching the shipped
//! PlantVillage weights is embedded in the binary; deployments with other
//! weights point the pipeline at their own catalog file.

use crate::error::{Error, Result};
use crate::types::DiseaseClass;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("../assets/plantvillage.yaml");

/// One catalog entry as written in the catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Class identifier
    pub id: DiseaseClass,

    /// Advisory text; the catalog fallback is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    fallback_treatment: String,
    classes: Vec<CatalogEntry>,
}

/// Ordered label table with treatment lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    fallback_treatment: String,
    classes: Vec<DiseaseClass>,
    treatments: HashMap<DiseaseClass, String>,
}

impl Catalog {
    /// The embedded PlantVillage catalog
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid catalog: {e}")))?;
        Self::from_entries(file.version, file.fallback_treatment, file.classes)
    }

    /// Load a catalog file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read catalog {}: {e}", path.display()))
        })?;
        let catalog = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            version = %catalog.version,
            classes = catalog.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from entries in model output order
    pub fn from_entries(
        version: impl Into<String>,
        fallback_treatment: impl Into<String>,
        entries: Vec<CatalogEntry>,
    ) -> Result<Self> {
        let fallback_treatment = fallback_treatment.into();
        if fallback_treatment.trim().is_empty() {
            return Err(Error::config("catalog fallback treatment must not be empty"));
        }
        if entries.is_empty() {
            return Err(Error::config("catalog must list at least one class"));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut classes = Vec::with_capacity(entries.len());
        let mut treatments = HashMap::with_capacity(entries.len());

        for entry in entries {
            if !seen.insert(entry.id.clone()) {
                return Err(Error::config(format!(
                    "catalog lists class '{}' more than once",
                    entry.id
                )));
            }
            if let Some(treatment) = entry.treatment.filter(|t| !t.trim().is_empty()) {
                treatments.insert(entry.id.clone(), treatment);
            }
            classes.push(entry.id);
        }

        Ok(Self {
            version: version.into(),
            fallback_treatment,
            classes,
            treatments,
        })
    }

    /// Catalog version string
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of classes, which must equal the disease model's output width
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes in model output order
    pub fn classes(&self) -> &[DiseaseClass] {
        &self.classes
    }

    /// Class for a model output index
    pub fn class_at(&self, index: usize) -> Option<&DiseaseClass> {
        self.classes.get(index)
    }

    /// Treatment advice for a class. Never empty: classes without an entry
    /// get the generic fallback.
    pub fn treatment_for(&self, class: &DiseaseClass) -> &str {
        self.treatments
            .get(class)
            .map(String::as_str)
            .unwrap_or(&self.fallback_treatment)
    }

    /// Whether a class has its own treatment entry
    pub fn has_treatment(&self, class: &DiseaseClass) -> bool {
        self.treatments.contains_key(class)
    }

    pub fn fallback_treatment(&self) -> &str {
        &self.fallback_treatment
    }
}
