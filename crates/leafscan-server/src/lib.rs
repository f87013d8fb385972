//! LeafScan Server
//!
//! HTTP front end for the leaf disease pipeline:
//! - `POST /predict` takes a multipart `image` part and returns a diagnosis
//! - `GET /health` is an unconditional liveness probe
//! - `GET /metrics` renders Prometheus metrics

pub mod config;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use routes::{create_router, AppError};
pub use state::AppState;
