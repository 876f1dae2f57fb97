use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware};
use crate::routes::{health, sharing};
use crate::services::SharingController;

#[derive(Clone)]
pub struct AppState {
    pub controller: SharingController,
    pub config: Arc<Config>,
}

pub fn create_app(config: Config, controller: SharingController) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        controller,
        config: config.clone(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let sharing_routes = Router::new()
        .route("/api/v1/sharing", get(sharing::get_status))
        .route("/api/v1/sharing/name", put(sharing::update_name))
        .route("/api/v1/sharing/start", post(sharing::start_sharing))
        .route("/api/v1/sharing/stop", post(sharing::stop_sharing))
        .route("/api/v1/sharing/toggle", post(sharing::toggle_sharing));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(sharing_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
