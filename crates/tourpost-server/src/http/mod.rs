pub mod auth;
pub mod metrics;
mod routes;

pub use metrics::TourpostMetrics;
pub use routes::create_router;

use crate::backends::Backends;
use crate::config::EventClockConfig;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tourpost_core::{
    AgendaStore, GenerationSettings, ImagePromptGenerator, ImageService, LinkFinder,
    PostGenerator, SessionResolver, TourpostError,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AgendaStore>,
    pub posts: Arc<PostGenerator>,
    pub image_prompts: Arc<ImagePromptGenerator>,
    pub images: Arc<ImageService>,
    pub links: Arc<LinkFinder>,
    pub clock: EventClockConfig,
    /// Name of the configured text model.
    pub model: String,
    pub metrics: Arc<TourpostMetrics>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire every pipeline to the same agenda store and backends.
    pub fn new(
        store: Arc<AgendaStore>,
        backends: Backends,
        settings: GenerationSettings,
        clock: EventClockConfig,
        metrics: Arc<TourpostMetrics>,
    ) -> Self {
        let resolver = SessionResolver::new(store.clone());
        let model = backends.text.model_name().to_string();
        Self {
            posts: Arc::new(PostGenerator::new(
                resolver,
                backends.text.clone(),
                settings.clone(),
            )),
            image_prompts: Arc::new(ImagePromptGenerator::new(
                store.clone(),
                backends.text.clone(),
                settings.clone(),
            )),
            images: Arc::new(ImageService::new(backends.images)),
            links: Arc::new(LinkFinder::new(
                store.clone(),
                backends.search,
                backends.text,
                settings,
            )),
            store,
            clock,
            model,
            metrics,
            start_time: std::time::Instant::now(),
        }
    }
}

/// JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Custom error type for HTTP handlers
pub struct AppError(anyhow::Error);

/// Caller mistakes are 400, collaborator failures 502, everything else 500.
pub fn status_for(err: &TourpostError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_upstream_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<TourpostError>()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for);
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        }
        (status, Json(JsonResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
