// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use faucet_core::{AggregateError, ChainError};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    models::{ErrorResponse, HealthResponse},
    openapi::ApiDoc,
    routes::{donors, faucet},
    state::AppState,
};

/// Responses derived from live chain state must never be cached.
pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate, private";

/// Creates the axum application with all routes
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_json))
        .route("/openapi.yaml", get(openapi_yaml))
        .nest("/api", api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

fn api_routes(state: Arc<AppState>) -> Router {
    Router::new().merge(donors::routes()).merge(faucet::routes()).with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy".into(), service: "faucet-api".into() })
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn openapi_yaml() -> Response {
    match serde_yaml::to_string(&ApiDoc::openapi()) {
        Ok(yaml) => ([(header::CONTENT_TYPE, "application/x-yaml")], yaml).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to convert to YAML: {}", err),
        )
            .into_response(),
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist"
        })),
    )
}

/// Converts an unexpected failure into a JSON error response
pub fn handle_error(err: anyhow::Error) -> Response {
    tracing::error!("Request failed: {:?}", err);

    let upstream = err.chain().any(|cause| {
        cause.downcast_ref::<ChainError>().is_some()
            || cause.downcast_ref::<AggregateError>().is_some()
    });
    let message = if upstream {
        format!("RPC request failed: {:#}", err)
    } else {
        "An internal error occurred. Please try again later.".to_string()
    };

    error_response(StatusCode::INTERNAL_SERVER_ERROR, message, None, None)
}

pub fn error_response(
    status: StatusCode,
    error: String,
    reason: Option<&str>,
    seconds_left: Option<u64>,
) -> Response {
    let body = ErrorResponse { error, reason: reason.map(str::to_string), seconds_left };
    let mut res = (status, Json(body)).into_response();
    res.headers_mut().insert(header::CACHE_CONTROL, cache_control(NO_CACHE));
    res
}

/// Create a cache control header value safely
pub fn cache_control(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(NO_CACHE))
}

/// Wraps a successful body with the no-cache header
pub fn no_cache_json<T: serde::Serialize>(body: T) -> Response {
    let mut res = Json(body).into_response();
    res.headers_mut().insert(header::CACHE_CONTROL, cache_control(NO_CACHE));
    res
}
