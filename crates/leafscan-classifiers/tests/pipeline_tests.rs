//! Pipeline Integration Tests
//!
//! Exercises the gate, the disease classifier and the full pipeline with
//! mock models, so no weights are needed.

mod mock_classifiers;

use image::ImageFormat;
use leafscan_classifiers::ImageClassifier;
use leafscan_core::{Catalog, CatalogEntry, DiseaseClass, Error, SeverityTier, NOT_A_PLANT};
use mock_classifiers::*;
use std::sync::Arc;

const LATE_BLIGHT: usize = 30;
const CLASSES: usize = 38;

fn gate_model(peaks: &[(usize, f32)]) -> Arc<MockImageClassifier> {
    Arc::new(MockImageClassifier::new(
        "mock-gate",
        peaked_scores(GATE_LABELS.len(), peaks),
    ))
}

fn disease_model(index: usize, peak: f32) -> Arc<MockImageClassifier> {
    Arc::new(MockImageClassifier::peaked("mock-disease", CLASSES, index, peak))
}

#[test]
fn test_rejects_non_plant_with_top1_message() {
    let disease = disease_model(LATE_BLIGHT, 0.9);
    let pipeline = mock_pipeline(gate_model(&[(RETRIEVER, 0.873)]), disease.clone());

    let diagnosis = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Png))
        .unwrap();

    assert!(!diagnosis.is_plant);
    assert_eq!(diagnosis.disease, NOT_A_PLANT);
    assert_eq!(diagnosis.severity, SeverityTier::NotApplicable);
    assert_eq!(diagnosis.confidence, 0.0);
    assert_eq!(
        diagnosis.treatment,
        "This image appears to be \"golden retriever\" with 87.3% confidence. \
         Please upload an image of a plant leaf showing any disease symptoms."
    );

    // Rejected images never reach the disease model
    assert_eq!(disease.call_count(), 0);
}

#[test]
fn test_diagnoses_accepted_leaf() {
    let gate = gate_model(&[(CABBAGE, 0.55)]);
    let disease = disease_model(LATE_BLIGHT, 0.9234);
    let pipeline = mock_pipeline(gate.clone(), disease.clone());

    let outcome = pipeline.run(&leaf_image_bytes(ImageFormat::Png)).unwrap();
    let diagnosis = outcome.diagnosis;

    assert!(diagnosis.is_plant);
    assert_eq!(diagnosis.disease, "Tomato - Late blight");
    assert_eq!(diagnosis.severity, SeverityTier::High);
    assert_eq!(diagnosis.confidence, 92.34);
    assert_eq!(
        diagnosis.treatment,
        "Apply fungicide immediately. Remove severely infected plants. Improve air circulation."
    );

    assert!(outcome.gate.accepted);
    assert_eq!(outcome.gate.label, "head cabbage");
    assert_eq!(
        outcome.prediction.map(|p| p.class.as_str().to_string()),
        Some("Tomato___Late_blight".to_string())
    );

    // Each model sees its own input size
    assert_eq!(gate.last_shape(), Some(vec![1, 3, 224, 224]));
    assert_eq!(disease.last_shape(), Some(vec![1, 3, 32, 32]));
}

#[test]
fn test_jpeg_upload_is_accepted() {
    let pipeline = mock_pipeline(gate_model(&[(LEMON, 0.4)]), disease_model(0, 0.6));
    let diagnosis = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Jpeg))
        .unwrap();

    assert!(diagnosis.is_plant);
    assert_eq!(diagnosis.disease, "Apple - Apple scab");
    assert_eq!(diagnosis.severity, SeverityTier::Low);
}

#[test]
fn test_weak_keyword_match_accepted() {
    // Top-1 is a cat, but a plant label clears the weak threshold
    let pipeline = mock_pipeline(
        gate_model(&[(TABBY, 0.8), (LEMON, 0.07)]),
        disease_model(LATE_BLIGHT, 0.75),
    );

    let outcome = pipeline.run(&leaf_image_bytes(ImageFormat::Png)).unwrap();
    assert!(outcome.gate.accepted);
    assert_eq!(outcome.gate.label, "lemon");
    assert_eq!(outcome.diagnosis.severity, SeverityTier::Moderate);
}

#[test]
fn test_keyword_below_weak_threshold_rejected() {
    let pipeline = mock_pipeline(
        gate_model(&[(TABBY, 0.9), (LEMON, 0.04)]),
        disease_model(LATE_BLIGHT, 0.9),
    );

    let outcome = pipeline.run(&leaf_image_bytes(ImageFormat::Png)).unwrap();
    assert!(!outcome.gate.accepted);
    assert_eq!(outcome.gate.label, "tabby");
    assert!(outcome.prediction.is_none());
    assert!(outcome.diagnosis.treatment.contains("\"tabby\" with 90.0% confidence"));
}

#[test]
fn test_missing_treatment_uses_fallback() {
    let catalog = Catalog::from_entries(
        "test-2",
        "Consult a plant specialist for treatment options.",
        vec![
            CatalogEntry {
                id: DiseaseClass::new("Tomato___healthy").unwrap(),
                treatment: Some("No treatment needed.".to_string()),
            },
            CatalogEntry {
                id: DiseaseClass::new("Tomato___Leaf_Mold").unwrap(),
                treatment: None,
            },
        ],
    )
    .unwrap();

    let disease = Arc::new(MockImageClassifier::new("mock-disease", vec![0.2, 0.8]));
    let pipeline = mock_pipeline_with_catalog(gate_model(&[(CABBAGE, 0.5)]), disease, catalog);

    let diagnosis = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Png))
        .unwrap();
    assert_eq!(diagnosis.disease, "Tomato - Leaf Mold");
    assert_eq!(diagnosis.severity, SeverityTier::Moderate);
    assert_eq!(
        diagnosis.treatment,
        "Consult a plant specialist for treatment options."
    );
}

#[test]
fn test_same_bytes_same_diagnosis() {
    let pipeline = mock_pipeline(gate_model(&[(CABBAGE, 0.3)]), disease_model(7, 0.66));
    let bytes = leaf_image_bytes(ImageFormat::Png);

    let first = pipeline.diagnose(&bytes).unwrap();
    let second = pipeline.diagnose(&bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_undecodable_upload() {
    let gate = gate_model(&[(CABBAGE, 0.5)]);
    let pipeline = mock_pipeline(gate.clone(), disease_model(0, 0.9));

    let err = pipeline.diagnose(b"GIF89a but not really").unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(matches!(pipeline.diagnose(&[]), Err(Error::Decode(_))));
    assert_eq!(gate.call_count(), 0);
}

#[test]
fn test_gate_failure_propagates() {
    let pipeline = mock_pipeline(
        Arc::new(FailingClassifier::new("broken-gate").with_error("gate exploded")),
        disease_model(0, 0.9),
    );

    let err = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Png))
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("gate exploded"));
}

#[test]
fn test_disease_failure_propagates() {
    let pipeline = mock_pipeline(
        gate_model(&[(CABBAGE, 0.5)]),
        Arc::new(FailingClassifier::new("broken-disease")),
    );

    let err = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Png))
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[test]
fn test_disease_width_mismatch_is_inference_error() {
    let pipeline = mock_pipeline(
        gate_model(&[(CABBAGE, 0.5)]),
        Arc::new(MockImageClassifier::peaked("short", 10, 0, 0.9)),
    );

    let err = pipeline
        .diagnose(&leaf_image_bytes(ImageFormat::Png))
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[test]
fn test_diagnose_image_skips_decoding() {
    let pipeline = mock_pipeline(gate_model(&[(CABBAGE, 0.5)]), disease_model(LATE_BLIGHT, 0.9));
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(10, 10));

    let diagnosis = pipeline.diagnose_image(&image).unwrap();
    assert_eq!(diagnosis.disease, "Tomato - Late blight");
}

#[test]
fn test_pipeline_accessors() {
    let pipeline = mock_pipeline(gate_model(&[(CABBAGE, 0.5)]), disease_model(0, 0.9));
    assert_eq!(pipeline.catalog().len(), CLASSES);
    assert_eq!(pipeline.gate().model_name(), "mock-gate");
    assert_eq!(pipeline.classifier().model_name(), "mock-disease");
}

#[test]
fn test_mock_is_object_safe() {
    let model: Arc<dyn ImageClassifier> = gate_model(&[(CABBAGE, 0.5)]);
    assert_eq!(model.name(), "mock-gate");
}
