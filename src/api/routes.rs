use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{auth_middleware, AuthService};
use crate::cache::ResultCache;

use super::handlers::{get_ranking, health_check, refresh, AppState};

pub fn create_api_router(cache: Arc<ResultCache>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { cache });

    let protected_routes = Router::new()
        .route("/api/refresh", post(refresh))
        .route_layer(middleware::from_fn_with_state(auth_service, auth_middleware));

    // Widgets on other origins only ever read
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/rankings/{window}", get(get_ranking))
        .merge(protected_routes)
        .layer(cors)
        .with_state(state)
}
