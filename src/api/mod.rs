//! HTTP 接口（控制台后端）
//!
//! 所有处理函数共享一个 Scheduler；错误统一返回 {"error": 种类, "detail": 描述}。

mod handlers;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::Scheduler;

pub use handlers::ApiError;

/// 构建路由；cors_origins 为空时允许任意来源
pub fn router(scheduler: Scheduler, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config).post(handlers::update_config))
        .route("/rss/fetch", post(handlers::fetch_rss))
        .route("/queue", get(handlers::get_queue).delete(handlers::clear_queue))
        .route("/queue/:id", delete(handlers::remove_item))
        .route("/queue/process", post(handlers::process_queue))
        .route("/logs", get(handlers::get_logs).delete(handlers::clear_logs))
        .route("/status", get(handlers::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(scheduler)
}
