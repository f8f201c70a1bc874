use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::core::{FetchOutcome, PipelineConfig, Scheduler, SchedulerError, StatusSnapshot};

/// 接口错误：状态码 + 错误种类 + 可读描述
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::ConfigurationMissing
            | SchedulerError::AlreadyRunning
            | SchedulerError::EmptyQueue
            | SchedulerError::IncompleteEntry => StatusCode::BAD_REQUEST,
            SchedulerError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SchedulerError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::Feed(_)
            | SchedulerError::Collaborator { .. }
            | SchedulerError::Timeout { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.kind, "detail": self.detail }));
        (self.status, body).into_response()
    }
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({ "message": "Shortcast API", "status": "running" }))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

pub(super) async fn update_config(
    State(scheduler): State<Scheduler>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let config = PipelineConfig::from_json(&body)?;
    scheduler.set_config(config);
    Ok(Json(json!({ "message": "Configuration updated successfully" })))
}

pub(super) async fn get_config(
    State(scheduler): State<Scheduler>,
) -> Result<Json<PipelineConfig>, ApiError> {
    scheduler
        .config()
        .map(|cfg| Json(cfg.as_ref().clone()))
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                SchedulerError::ConfigurationMissing.kind(),
                "No configuration found",
            )
        })
}

pub(super) async fn fetch_rss(
    State(scheduler): State<Scheduler>,
) -> Result<Json<FetchOutcome>, ApiError> {
    Ok(Json(scheduler.fetch_feed().await?))
}

pub(super) async fn get_queue(State(scheduler): State<Scheduler>) -> Json<Value> {
    let queue = scheduler.queue();
    Json(json!({ "count": queue.len(), "queue": queue }))
}

pub(super) async fn remove_item(
    State(scheduler): State<Scheduler>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    scheduler.remove_item(&id)?;
    Ok(Json(json!({ "message": "Item removed from queue" })))
}

pub(super) async fn clear_queue(State(scheduler): State<Scheduler>) -> Json<Value> {
    let cleared = scheduler.clear_queue();
    Json(json!({
        "message": format!("Cleared {} items from queue", cleared),
        "cleared": cleared,
    }))
}

pub(super) async fn process_queue(
    State(scheduler): State<Scheduler>,
) -> Result<Json<Value>, ApiError> {
    // 运行在后台继续，不等待句柄
    let _handle = scheduler.start_run()?;
    Ok(Json(json!({ "message": "Queue processing started" })))
}

pub(super) async fn get_logs(State(scheduler): State<Scheduler>) -> Json<Value> {
    let logs = scheduler.logs();
    Json(json!({ "count": logs.len(), "logs": logs }))
}

pub(super) async fn clear_logs(State(scheduler): State<Scheduler>) -> Json<Value> {
    let cleared = scheduler.clear_logs();
    Json(json!({
        "message": format!("Cleared {} log entries", cleared),
        "cleared": cleared,
    }))
}

pub(super) async fn status(State(scheduler): State<Scheduler>) -> Json<StatusSnapshot> {
    Json(scheduler.status())
}
