//! Configuration for the gate, the disease model and the pipeline

use crate::model_loader::{DeviceType, ModelSource};
use leafscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Plant-related terms matched against general classifier labels
pub const DEFAULT_PLANT_KEYWORDS: &[&str] = &[
    "leaf", "plant", "vegetable", "fruit", "flower", "tree", "vine", "corn", "grape", "orange",
    "strawberry", "mushroom", "broccoli", "cauliflower", "cucumber", "pepper", "squash",
    "pomegranate", "cabbage", "artichoke", "cardoon", "bell_pepper", "zucchini", "acorn", "ear",
    "lemon", "pineapple", "banana", "apple", "cherry", "tomato", "potato", "head_cabbage",
    "butternut_squash", "spaghetti_squash", "green", "botanical",
];

/// Configuration for the whole decision pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Device both models run on
    #[serde(default)]
    pub device: DeviceType,

    /// Catalog file; the embedded PlantVillage catalog when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Plant-presence gate
    #[serde(default)]
    pub gate: GateConfig,

    /// Disease classifier
    #[serde(default)]
    pub disease: DiseaseModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device: DeviceType::Cpu,
            catalog_path: None,
            gate: GateConfig::default(),
            disease: DiseaseModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid pipeline config: {e}")))
    }

    /// Check values before any model is loaded
    pub fn validate(&self) -> Result<()> {
        self.gate.validate()?;
        self.disease.validate()
    }
}

/// Backbone used by the plant-presence gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GateArchitecture {
    #[default]
    #[serde(rename = "mobilenetv4-small")]
    MobileNetV4Small,
    #[serde(rename = "mobilenetv4-medium")]
    MobileNetV4Medium,
    #[serde(rename = "mobilenetv4-large")]
    MobileNetV4Large,
}

/// Plant-presence gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub architecture: GateArchitecture,

    /// SafeTensors weights of the ImageNet backbone
    #[serde(default = "default_gate_weights")]
    pub weights: ModelSource,

    /// ImageNet class names, in output order
    #[serde(default = "default_gate_labels")]
    pub labels: ModelSource,

    /// Side of the square model input
    #[serde(default = "default_gate_input_size")]
    pub input_size: u32,

    /// How many top predictions are checked against the keywords
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// A keyword match above this probability is accepted immediately
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f32,

    /// The best keyword match is accepted if it is above this probability
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f32,

    /// Plant-related label fragments
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            architecture: GateArchitecture::default(),
            weights: default_gate_weights(),
            labels: default_gate_labels(),
            input_size: default_gate_input_size(),
            top_k: default_top_k(),
            strong_threshold: default_strong_threshold(),
            weak_threshold: default_weak_threshold(),
            keywords: default_keywords(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(Error::config("gate input_size must be positive"));
        }
        if self.top_k == 0 {
            return Err(Error::config("gate top_k must be at least 1"));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.strong_threshold) || !in_unit(self.weak_threshold) {
            return Err(Error::config("gate thresholds must be within [0, 1]"));
        }
        if self.weak_threshold > self.strong_threshold {
            return Err(Error::config(format!(
                "gate weak_threshold ({}) must not exceed strong_threshold ({})",
                self.weak_threshold, self.strong_threshold
            )));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::config("gate keywords must not be empty"));
        }
        Ok(())
    }
}

/// Disease classifier configuration.
///
/// The network is a Keras-style sequential CNN: one valid-padded
/// convolution + ReLU + 2x2 max-pool block per entry of `conv_filters`,
/// a ReLU dense layer per entry of `dense_units`, then one output per
/// catalog class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseModelConfig {
    /// SafeTensors weights converted from the trained model
    #[serde(default = "default_disease_weights")]
    pub weights: ModelSource,

    /// Side of the square model input
    #[serde(default = "default_disease_input_size")]
    pub input_size: u32,

    /// Output channels of each convolution block
    #[serde(default = "default_conv_filters")]
    pub conv_filters: Vec<usize>,

    /// Convolution kernel side
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,

    /// Hidden dense layer widths
    #[serde(default = "default_dense_units")]
    pub dense_units: Vec<usize>,
}

impl Default for DiseaseModelConfig {
    fn default() -> Self {
        Self {
            weights: default_disease_weights(),
            input_size: default_disease_input_size(),
            conv_filters: default_conv_filters(),
            kernel_size: default_kernel_size(),
            dense_units: default_dense_units(),
        }
    }
}

impl DiseaseModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.conv_filters.is_empty() || self.conv_filters.contains(&0) {
            return Err(Error::config("disease conv_filters must be non-empty and positive"));
        }
        if self.dense_units.contains(&0) {
            return Err(Error::config("disease dense_units must be positive"));
        }
        if self.kernel_size == 0 {
            return Err(Error::config("disease kernel_size must be positive"));
        }
        if self.feature_map_side().is_none() {
            return Err(Error::config(format!(
                "disease input_size {} is too small for {} conv blocks with kernel {}",
                self.input_size,
                self.conv_filters.len(),
                self.kernel_size
            )));
        }
        Ok(())
    }

    /// Spatial side after the last conv block, `None` if it shrinks to zero
    pub fn feature_map_side(&self) -> Option<usize> {
        let shrink = self.kernel_size.checked_sub(1)?;
        let mut side = self.input_size as usize;
        for _ in &self.conv_filters {
            side = side.checked_sub(shrink)? / 2;
            if side == 0 {
                return None;
            }
        }
        Some(side)
    }

    /// Width of the flattened feature vector feeding the first dense layer
    pub fn flattened_features(&self) -> Option<usize> {
        let side = self.feature_map_side()?;
        let channels = *self.conv_filters.last()?;
        Some(side * side * channels)
    }
}

fn default_gate_weights() -> ModelSource {
    ModelSource::hf("timm/mobilenetv4_conv_small.e2400_r224_in1k", "model.safetensors")
}

fn default_gate_labels() -> ModelSource {
    ModelSource::hf_dataset("huggingface/label-files", "imagenet-1k-id2label.json")
}

fn default_gate_input_size() -> u32 {
    224
}

fn default_top_k() -> usize {
    10
}

fn default_strong_threshold() -> f32 {
    0.10
}

fn default_weak_threshold() -> f32 {
    0.05
}

fn default_keywords() -> Vec<String> {
    DEFAULT_PLANT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_disease_weights() -> ModelSource {
    ModelSource::local("model/plant_disease_model.safetensors")
}

fn default_disease_input_size() -> u32 {
    150
}

fn default_conv_filters() -> Vec<usize> {
    vec![32, 64, 128, 128]
}

fn default_kernel_size() -> usize {
    3
}

fn default_dense_units() -> Vec<usize> {
    vec![512]
}
