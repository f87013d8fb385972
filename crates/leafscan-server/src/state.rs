//! Shared application state and inference dispatch

use bytes::Bytes;
use leafscan_classifiers::{DiagnosisPipeline, PipelineConfig};
use leafscan_core::{Diagnosis, Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded models, read-only after startup
    pub pipeline: Arc<DiagnosisPipeline>,

    /// Server settings
    pub config: Arc<ServerConfig>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,

    inference_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: Arc<DiagnosisPipeline>, config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        let inference_timeout = config.inference_timeout();
        Self {
            pipeline,
            config: Arc::new(config),
            metrics_handle,
            inference_timeout,
        }
    }

    /// Load both models and build the state. Loading may download weights,
    /// so it runs on the blocking pool.
    pub async fn load(
        server: ServerConfig,
        pipeline: PipelineConfig,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self> {
        info!("Loading models...");
        let pipeline = tokio::task::spawn_blocking(move || DiagnosisPipeline::load(&pipeline))
            .await
            .map_err(|e| Error::internal(format!("model loading task failed: {e}")))??;
        info!(
            "Models loaded: gate={}, disease={}",
            pipeline.gate().model_name(),
            pipeline.classifier().model_name()
        );

        Ok(Self::new(Arc::new(pipeline), server, metrics_handle))
    }

    /// Override the per-request inference budget
    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn inference_timeout(&self) -> Duration {
        self.inference_timeout
    }
}

/// Run the pipeline on the blocking pool within the inference budget
pub async fn execute_diagnosis(state: &AppState, image: Bytes) -> Result<Diagnosis> {
    let pipeline = state.pipeline.clone();
    let task = tokio::task::spawn_blocking(move || pipeline.run(&image));

    let outcome = match tokio::time::timeout(state.inference_timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(Error::internal(format!("inference task failed: {e}"))),
        Err(_) => {
            // The blocking task keeps running; its result is dropped
            warn!(
                timeout_ms = state.inference_timeout.as_millis() as u64,
                "inference exceeded its budget"
            );
            return Err(Error::Timeout);
        }
    };

    let label = if outcome.diagnosis.is_plant {
        "diagnosed"
    } else {
        "not_a_plant"
    };
    metrics::counter!("leafscan_diagnoses_total", "outcome" => label).increment(1);
    metrics::histogram!("leafscan_inference_latency_us").record(outcome.latency_us as f64);

    debug!(
        outcome = label,
        disease = %outcome.diagnosis.disease,
        latency_us = outcome.latency_us,
        "diagnosis complete"
    );
    Ok(outcome.diagnosis)
}
