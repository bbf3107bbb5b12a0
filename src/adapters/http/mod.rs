pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::adapters::http::state::HttpState;
use crate::config::AppConfig;

/// Margen sobre el tamaño máximo de subida: el base64 de `/api/detect` ocupa ~4/3.
const BODY_HEADROOM: usize = 1024 * 1024;

pub fn router(state: HttpState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/upload", post(routes::upload))
        .route("/api/detect", post(routes::detect))
        .route("/api/result/{id}", get(routes::get_result))
        .route("/api/history", get(routes::history))
        .layer(cors)
        .with_state(state);

    Router::new()
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/segmentation_results", ServeDir::new(&config.segmentation_dir))
        .layer(DefaultBodyLimit::max(config.max_file_size * 2 + BODY_HEADROOM))
        .layer(TraceLayer::new_for_http())
}
