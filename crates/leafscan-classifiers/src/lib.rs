//! LeafScan Classifiers
//!
//! Image classifiers and the decision pipeline behind the `/predict`
//! endpoint.
//!
//! Two pretrained models are used as black boxes:
//! - a general-purpose ImageNet classifier (MobileNetV4) acting as a
//!   plant-presence gate
//! - a sequential CNN fine-tuned on PlantVillage leaf imagery
//!
//! Both run on Candle and are loaded once at startup.

pub mod backbone;
pub mod classifier;
pub mod cnn;
pub mod config;
pub mod disease;
pub mod gate;
pub mod labels;
pub mod model_loader;
pub mod pipeline;
pub mod preprocess;

pub use classifier::{ImageClassifier, LabelScore};
pub use config::{DiseaseModelConfig, GateArchitecture, GateConfig, PipelineConfig, DEFAULT_PLANT_KEYWORDS};
pub use disease::{DiseaseClassifier, DiseasePrediction};
pub use gate::{GateVerdict, KeywordMatcher, PlantGate};
pub use labels::LabelSet;
pub use model_loader::{DeviceType, HubRepoKind, ModelSource};
pub use pipeline::{decode_image, DiagnosisOutcome, DiagnosisPipeline};
pub use preprocess::{Normalization, Preprocessor};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::ImageClassifier;
    pub use crate::config::PipelineConfig;
    pub use crate::disease::DiseaseClassifier;
    pub use crate::gate::PlantGate;
    pub use crate::pipeline::DiagnosisPipeline;
}
