//! HTTP surface of the pxgate image proxy.
//!
//! One real endpoint: `GET /proxy/{encodedUrl}`. Every response carries
//! a cache-control header: failures are cacheable for ten minutes to
//! shed retry storms, successful bodies for a year, immutable.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use pxgate_common::ProxyError;
use pxgate_core::{Pipeline, ProxyBody, ProxyResponse};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;

pub const FAILURE_CACHE_CONTROL: &str = "public, max-age=600";
pub const SUCCESS_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/proxy/:encoded", any(proxy_handler))
        .route("/proxy", any(missing_target_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Pipeline error wrapper carrying the cache-control and status policy.
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        }));
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(FAILURE_CACHE_CONTROL),
        );
        response
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    Path(encoded): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    if method != Method::GET {
        return Err(ProxyError::InvalidMethod.into());
    }

    let ProxyResponse { body, content_type, served_from } =
        state.pipeline.handle(&encoded, &params).await?;
    info!(%content_type, ?served_from, "serving proxied image");

    let body = match body {
        ProxyBody::Bytes(bytes) => Body::from(bytes),
        ProxyBody::Stream(stream) => Body::from_stream(stream),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, SUCCESS_CACHE_CONTROL)
        .body(body)
        .map_err(|e| ApiError(ProxyError::Internal(e.to_string())))
}

async fn missing_target_handler() -> ApiError {
    ApiError(ProxyError::MissingParam("url"))
}

async fn not_found_handler() -> Response {
    let mut response = (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not_found" })),
    )
        .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(FAILURE_CACHE_CONTROL),
    );
    response
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
