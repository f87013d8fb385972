//! Latency benchmarks for the CPU-bound parts of a diagnosis
//!
//! Covers the work done around the models on every request:
//! - preprocessing an upload into a tensor for each model input size
//! - ranking and keyword matching in the plant gate
//! - the full pipeline with stub models, decode included
//!
//! Run with: cargo bench -p leafscan-classifiers

use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use leafscan_classifiers::classifier::top_k;
use leafscan_classifiers::{
    DiagnosisPipeline, DiseaseClassifier, GateConfig, ImageClassifier, KeywordMatcher, LabelSet,
    Normalization, PlantGate, Preprocessor, DEFAULT_PLANT_KEYWORDS,
};
use leafscan_core::{Catalog, Result};
use std::io::Cursor;
use std::sync::Arc;

struct FixedScores(Vec<f32>);

impl ImageClassifier for FixedScores {
    fn predict(&self, _input: &Tensor) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn sample_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn imagenet_labels() -> LabelSet {
    let mut labels: Vec<String> = (0..1000).map(|i| format!("class {i}, synonym")).collect();
    labels[937] = "broccoli".to_string();
    labels[948] = "Granny Smith".to_string();
    LabelSet::new(labels).unwrap()
}

/// Benchmark preprocessing at both model input sizes
fn benchmark_preprocess(c: &mut Criterion) {
    let image = sample_image(640, 480);
    let mut group = c.benchmark_group("Preprocess");

    for (name, preprocessor) in [
        ("gate_224", Preprocessor::new(224, Normalization::imagenet())),
        ("disease_150", Preprocessor::new(150, Normalization::UnitRange)),
    ] {
        group.bench_with_input(BenchmarkId::new("to_tensor", name), &preprocessor, |b, p| {
            b.iter(|| p.to_tensor(black_box(&image), &Device::Cpu).unwrap());
        });
    }

    group.finish();
}

/// Benchmark gate ranking and the keyword policy over 1000 ImageNet scores
fn benchmark_gate_policy(c: &mut Criterion) {
    let mut scores = vec![0.0005f32; 1000];
    scores[948] = 0.3;
    scores[937] = 0.2;

    let gate = PlantGate::new(
        Arc::new(FixedScores(scores.clone())),
        imagenet_labels(),
        &GateConfig::default(),
        Device::Cpu,
    )
    .unwrap();
    let matcher = KeywordMatcher::new(DEFAULT_PLANT_KEYWORDS).unwrap();

    let mut group = c.benchmark_group("Gate_Policy");
    group.bench_function("top_k_10", |b| b.iter(|| top_k(black_box(&scores), 10)));
    group.bench_function("rank_and_decide", |b| {
        b.iter(|| {
            let ranked = gate.rank(black_box(&scores)).unwrap();
            gate.decide(&ranked)
        })
    });
    group.bench_function("keyword_match", |b| {
        b.iter(|| matcher.matches(black_box("Granny Smith")))
    });
    group.finish();
}

/// Benchmark a full diagnosis with stub models
fn benchmark_pipeline(c: &mut Criterion) {
    let mut gate_scores = vec![0.0005f32; 1000];
    gate_scores[937] = 0.5;
    let gate = PlantGate::new(
        Arc::new(FixedScores(gate_scores)),
        imagenet_labels(),
        &GateConfig::default(),
        Device::Cpu,
    )
    .unwrap();

    let catalog = Arc::new(Catalog::builtin().unwrap());
    let mut disease_scores = vec![0.001f32; catalog.len()];
    disease_scores[30] = 0.9;
    let classifier = DiseaseClassifier::new(
        Arc::new(FixedScores(disease_scores)),
        catalog,
        150,
        Device::Cpu,
    );
    let pipeline = DiagnosisPipeline::new(gate, classifier);

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(sample_image(256, 256))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let mut group = c.benchmark_group("Pipeline");
    group.sample_size(50);
    group.bench_function("diagnose_png_256", |b| {
        b.iter(|| pipeline.diagnose(black_box(&bytes)).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_preprocess,
    benchmark_gate_policy,
    benchmark_pipeline
);
criterion_main!(benches);
