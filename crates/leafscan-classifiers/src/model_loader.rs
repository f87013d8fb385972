//! Model weight resolution and loading for Candle-based classifiers

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::{api::sync::Api, Repo, RepoType};
use leafscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Source location for a model artifact (weights or label file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSource {
    /// Load from local file system
    Local { path: PathBuf },

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        filename: String,
        #[serde(default)]
        revision: Option<String>,
        #[serde(default)]
        repo_type: HubRepoKind,
    },
}

/// Kind of Hugging Face repository an artifact lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubRepoKind {
    #[default]
    Model,
    Dataset,
}

impl ModelSource {
    /// Create a local source
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Create a Hugging Face model source
    pub fn hf(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo_id: repo_id.into(),
            filename: filename.into(),
            revision: None,
            repo_type: HubRepoKind::Model,
        }
    }

    /// Create a Hugging Face dataset source
    pub fn hf_dataset(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo_id: repo_id.into(),
            filename: filename.into(),
            revision: None,
            repo_type: HubRepoKind::Dataset,
        }
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, rev: impl Into<String>) -> Self {
        if let Self::HuggingFace { revision, .. } = &mut self {
            *revision = Some(rev.into());
        }
        self
    }

    /// Resolve to a file on disk, downloading into the hf-hub cache if needed
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::Local { path } => {
                if !path.exists() {
                    return Err(Error::config(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            Self::HuggingFace {
                repo_id,
                filename,
                revision,
                repo_type,
            } => {
                info!("Fetching {} from Hugging Face repo {}", filename, repo_id);

                let api = Api::new()
                    .map_err(|e| Error::model(format!("failed to initialize HF API: {e}")))?;

                let kind = match repo_type {
                    HubRepoKind::Model => RepoType::Model,
                    HubRepoKind::Dataset => RepoType::Dataset,
                };
                let repo = api.repo(Repo::with_revision(
                    repo_id.clone(),
                    kind,
                    revision.clone().unwrap_or_else(|| "main".to_string()),
                ));

                repo.get(filename).map_err(|e| {
                    Error::model(format!("failed to download {filename} from {repo_id}: {e}"))
                })
            }
        }
    }
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (if compiled in)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl DeviceType {
    /// Create the Candle device
    pub fn create(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(idx) => Device::new_cuda(idx)
                .map_err(|e| Error::model(format!("failed to create CUDA device: {e}"))),
            Self::Metal(idx) => Device::new_metal(idx)
                .map_err(|e| Error::model(format!("failed to create Metal device: {e}"))),
        }
    }
}

/// Memory-map SafeTensors weights into a VarBuilder
pub fn load_safetensors(weights_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    // SAFETY: the weight file is treated as read-only for the process
    // lifetime; nothing in this service writes to it after startup.
    unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device).map_err(|e| {
            Error::model(format!(
                "failed to load SafeTensors {}: {e}",
                weights_path.display()
            ))
        })
    }
}
