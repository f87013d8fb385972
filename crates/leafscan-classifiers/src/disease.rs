//! Disease classifier over the PlantVillage label table

use crate::classifier::{argmax, validate_scores, ImageClassifier};
use crate::cnn::LeafCnnClassifier;
use crate::config::DiseaseModelConfig;
use crate::preprocess::{Normalization, Preprocessor};
use candle_core::Device;
use image::RgbImage;
use leafscan_core::{Catalog, DiseaseClass, Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Arg-max class and its confidence
#[derive(Debug, Clone, PartialEq)]
pub struct DiseasePrediction {
    pub class: DiseaseClass,

    /// Probability of `class` times 100
    pub confidence_percent: f64,
}

/// Maps disease model output to catalog classes
pub struct DiseaseClassifier {
    model: Arc<dyn ImageClassifier>,
    catalog: Arc<Catalog>,
    preprocessor: Preprocessor,
    device: Device,
}

impl DiseaseClassifier {
    pub fn new(
        model: Arc<dyn ImageClassifier>,
        catalog: Arc<Catalog>,
        input_size: u32,
        device: Device,
    ) -> Self {
        Self {
            model,
            catalog,
            preprocessor: Preprocessor::new(input_size, Normalization::UnitRange),
            device,
        }
    }

    /// Load the configured CNN with one output per catalog class
    pub fn load(config: &DiseaseModelConfig, catalog: Arc<Catalog>, device: &Device) -> Result<Self> {
        let model = LeafCnnClassifier::load(config, catalog.len(), device)?;
        Ok(Self::new(Arc::new(model), catalog, config.input_size, device.clone()))
    }

    /// Classify a leaf image
    pub fn classify(&self, image: &RgbImage) -> Result<DiseasePrediction> {
        let start = Instant::now();
        let input = self.preprocessor.to_tensor(image, &self.device)?;
        let scores = self.model.predict(&input)?;
        let prediction = self.select(&scores)?;

        debug!(
            model = self.model.name(),
            class = %prediction.class,
            confidence = prediction.confidence_percent,
            latency_us = start.elapsed().as_micros() as u64,
            "disease prediction"
        );
        Ok(prediction)
    }

    /// Pick the most probable class from a probability vector
    pub fn select(&self, scores: &[f32]) -> Result<DiseasePrediction> {
        validate_scores(self.model.name(), scores)?;
        if scores.len() != self.catalog.len() {
            return Err(Error::inference(format!(
                "{} produced {} scores but the catalog ({}) has {} classes",
                self.model.name(),
                scores.len(),
                self.catalog.version(),
                self.catalog.len()
            )));
        }

        let (index, probability) = argmax(scores)
            .ok_or_else(|| Error::inference("disease model produced no scores"))?;
        let class = self
            .catalog
            .class_at(index)
            .cloned()
            .ok_or_else(|| Error::inference(format!("no catalog class at index {index}")))?;

        Ok(DiseasePrediction {
            class,
            confidence_percent: f64::from(probability) * 100.0,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Tensor;

    struct NullModel;

    impl ImageClassifier for NullModel {
        fn predict(&self, _input: &Tensor) -> Result<Vec<f32>> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    fn classifier() -> DiseaseClassifier {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        DiseaseClassifier::new(Arc::new(NullModel), catalog, 150, Device::Cpu)
    }

    #[test]
    fn test_select_argmax() {
        let classifier = classifier();
        let mut scores = vec![0.0f32; 38];
        scores[30] = 0.9;
        scores[29] = 0.1;

        let prediction = classifier.select(&scores).unwrap();
        assert_eq!(prediction.class.as_str(), "Tomato___Late_blight");
        assert!((prediction.confidence_percent - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_select_first_index_on_tie() {
        let classifier = classifier();
        let scores = vec![1.0 / 38.0; 38];
        let prediction = classifier.select(&scores).unwrap();
        assert_eq!(prediction.class.as_str(), "Apple___Apple_scab");
    }

    #[test]
    fn test_select_width_mismatch() {
        let classifier = classifier();
        let err = classifier.select(&[0.5; 37]).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(err.to_string().contains("plantvillage-38-v1"));
    }
}
