//! Two-stage decision pipeline
//!
//! Decodes an upload, asks the plant-presence gate whether it shows a plant,
//! classifies accepted images, buckets the confidence and looks up the
//! treatment. The pipeline is built once and shared read-only between
//! requests.

use crate::config::PipelineConfig;
use crate::disease::{DiseaseClassifier, DiseasePrediction};
use crate::gate::{GateVerdict, PlantGate};
use image::{DynamicImage, RgbImage};
use leafscan_core::{Catalog, Diagnosis, Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything the pipeline decided for one image
#[derive(Debug, Clone)]
pub struct DiagnosisOutcome {
    /// Response payload
    pub diagnosis: Diagnosis,

    /// Gate verdict
    pub gate: GateVerdict,

    /// Disease prediction, absent when the gate rejected the image
    pub prediction: Option<DiseasePrediction>,

    /// Total latency in microseconds, decode included
    pub latency_us: u64,
}

/// Gate, classifier and catalog wired together
pub struct DiagnosisPipeline {
    gate: PlantGate,
    classifier: DiseaseClassifier,
    catalog: Arc<Catalog>,
}

impl DiagnosisPipeline {
    pub fn new(gate: PlantGate, classifier: DiseaseClassifier) -> Self {
        let catalog = classifier.catalog().clone();
        Self {
            gate,
            classifier,
            catalog,
        }
    }

    /// Load both models and the catalog described by the configuration.
    /// Blocking: may download weights and memory-maps them.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let device = config.device.create()?;

        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin()?,
        };
        info!(
            "Using catalog {} with {} classes",
            catalog.version(),
            catalog.len()
        );
        let catalog = Arc::new(catalog);

        let gate = PlantGate::load(&config.gate, &device)?;
        let classifier = DiseaseClassifier::load(&config.disease, catalog.clone(), &device)?;

        Ok(Self {
            gate,
            classifier,
            catalog,
        })
    }

    /// Diagnose raw upload bytes
    pub fn diagnose(&self, bytes: &[u8]) -> Result<Diagnosis> {
        self.run(bytes).map(|outcome| outcome.diagnosis)
    }

    /// Diagnose raw upload bytes, keeping the intermediate decisions
    pub fn run(&self, bytes: &[u8]) -> Result<DiagnosisOutcome> {
        let start = Instant::now();
        let image = decode_image(bytes)?;
        let mut outcome = self.run_rgb(&image.to_rgb8())?;
        outcome.latency_us = start.elapsed().as_micros() as u64;
        Ok(outcome)
    }

    /// Diagnose an image that is already decoded
    pub fn diagnose_image(&self, image: &DynamicImage) -> Result<Diagnosis> {
        self.run_rgb(&image.to_rgb8()).map(|outcome| outcome.diagnosis)
    }

    fn run_rgb(&self, image: &RgbImage) -> Result<DiagnosisOutcome> {
        let start = Instant::now();
        let gate = self.gate.is_plant(image)?;

        if !gate.accepted {
            debug!(label = %gate.label, confidence = gate.confidence, "image rejected by plant gate");
            return Ok(DiagnosisOutcome {
                diagnosis: Diagnosis::not_a_plant(&gate.label, gate.confidence),
                gate,
                prediction: None,
                latency_us: start.elapsed().as_micros() as u64,
            });
        }

        let prediction = self.classifier.classify(image)?;
        let treatment = self.catalog.treatment_for(&prediction.class);
        let diagnosis = Diagnosis::detected(&prediction.class, prediction.confidence_percent, treatment);

        debug!(
            class = %prediction.class,
            confidence = prediction.confidence_percent,
            severity = %diagnosis.severity,
            "leaf diagnosed"
        );

        Ok(DiagnosisOutcome {
            diagnosis,
            gate,
            prediction: Some(prediction),
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn gate(&self) -> &PlantGate {
        &self.gate
    }

    pub fn classifier(&self) -> &DiseaseClassifier {
        &self.classifier
    }
}

/// Decode image bytes, sniffing the format from the content
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::decode("cannot identify image file: upload is empty"));
    }
    image::load_from_memory(bytes).map_err(|e| Error::decode(format!("cannot identify image file: {e}")))
}
