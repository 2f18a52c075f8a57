use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::AuthConfig;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Guards administrative endpoints with a static list of API keys
pub struct AuthService {
    api_keys: Arc<Vec<String>>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            api_keys: Arc::new(config.api_keys.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    pub fn validate_key(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        self.api_keys
            .iter()
            .any(|k| bool::from(k.as_bytes().ct_eq(key.as_bytes())))
    }
}

pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if auth_service.validate_key(api_key) {
        next.run(request).await
    } else {
        warn!("Rejected request to {} with invalid API key", request.uri().path());
        (StatusCode::UNAUTHORIZED, "Invalid or missing API key").into_response()
    }
}
