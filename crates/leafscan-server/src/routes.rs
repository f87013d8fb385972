//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use leafscan_core::{Diagnosis, Error};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::state::{self, AppState};

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// Error message for requests without an image part
pub const NO_IMAGE_PROVIDED: &str = "No image provided";

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when the list is empty, otherwise only the listed ones
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_check() -> Json<serde_json::Value> {
    metrics::counter!("leafscan_requests_total", "endpoint" => "health").increment(1);
    Json(json!({ "status": "healthy" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
        .into_response()
}

/// Diagnose an uploaded leaf photo
async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Diagnosis>, AppError> {
    metrics::counter!("leafscan_requests_total", "endpoint" => "predict").increment(1);
    let request_id = Uuid::new_v4();

    async move {
        let mut multipart = multipart.map_err(|rejection| {
            debug!("Request is not multipart: {}", rejection);
            AppError::from(Error::invalid_input(NO_IMAGE_PROVIDED))
        })?;

        let image = read_image_field(&mut multipart).await?;
        debug!(bytes = image.len(), "Received upload");

        let diagnosis = state::execute_diagnosis(&state, image).await?;
        Ok(Json(diagnosis))
    }
    .instrument(info_span!("predict", %request_id))
    .await
}

/// Bytes of the first `image` part
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(Error::invalid_input(NO_IMAGE_PROVIDED).into())
}

async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    /// Failure reported by the pipeline or the request checks
    Pipeline(Error),
    /// The multipart body could not be read
    Multipart(MultipartError),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Pipeline(err) => match err {
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
                Error::Decode(_)
                | Error::Inference(_)
                | Error::Model(_)
                | Error::Config(_)
                | Error::Io(_)
                | Error::Serialization(_)
                | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Multipart(err) => err.status(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Pipeline(err) => err.kind(),
            AppError::Multipart(_) => "multipart",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("leafscan_errors_total", "kind" => self.kind()).increment(1);

        let message = match self {
            AppError::Pipeline(err) => err.to_string(),
            AppError::Multipart(err) => err.body_text(),
        };

        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        } else {
            debug!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
