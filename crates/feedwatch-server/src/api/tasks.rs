use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use feedwatch_core::schedule::validate_cron;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::scheduler::{Dispatch, ScheduleCoordinator};

use super::{map_db_error, map_scheduler_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct TaskItem {
    id: i64,
    owner_id: i64,
    name: String,
    subjects: Vec<String>,
    schedule: String,
    is_enabled: bool,
    target_sink: Option<String>,
    ai_model: Option<String>,
    has_summary_prompt: bool,
    last_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    scheduled: bool,
    next_fire_at: Option<DateTime<Utc>>,
    running: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct RunAccepted {
    task_id: i64,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleUpdate {
    schedule: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnabledUpdate {
    enabled: bool,
}

impl TaskItem {
    async fn build(row: feedwatch_db::ScrapeTaskRow, coordinator: &ScheduleCoordinator) -> Self {
        let scheduled = coordinator.schedule_of(row.id).await.is_some();
        let next_fire_at = coordinator.next_fire_time(row.id).await;
        let running = coordinator.is_running(row.id);
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            subjects: row.subjects,
            schedule: row.schedule,
            is_enabled: row.is_enabled,
            target_sink: row.target_sink,
            ai_model: row.ai_model,
            has_summary_prompt: row
                .summary_prompt
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty()),
            last_run_at: row.last_run_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            scheduled,
            next_fire_at,
            running,
        }
    }
}

async fn load_task(state: &AppState, req_id: &str, id: i64) -> Result<TaskItem, ApiError> {
    let row = feedwatch_db::get_scrape_task(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.to_string(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", format!("task {id} not found")))?;
    Ok(TaskItem::build(row, &state.coordinator).await)
}

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TaskItem>>>, ApiError> {
    let rows = feedwatch_db::list_scrape_tasks(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        data.push(TaskItem::build(row, &state.coordinator).await);
    }

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TaskItem>>, ApiError> {
    let data = load_task(&state, &req_id.0, id).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Starts an execution in the background and returns `202` right away.
pub(super) async fn run_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<RunAccepted>>), ApiError> {
    feedwatch_db::get_scrape_task(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", format!("task {id} not found")))?;

    match state.coordinator.trigger_now(id) {
        Dispatch::Started => {
            tracing::info!(task_id = id, request_id = %req_id.0, "api: manual run started");
            Ok((
                StatusCode::ACCEPTED,
                Json(ApiResponse {
                    data: RunAccepted {
                        task_id: id,
                        status: "started",
                    },
                    meta: ResponseMeta::new(req_id.0),
                }),
            ))
        }
        Dispatch::AlreadyRunning => Err(ApiError::new(
            req_id.0,
            "conflict",
            format!("task {id} is already running"),
        )),
    }
}

/// Validates and stores a new cron expression, then re-registers the task.
pub(super) async fn update_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ScheduleUpdate>,
) -> Result<Json<ApiResponse<TaskItem>>, ApiError> {
    let schedule = validate_cron(&body.schedule)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    feedwatch_db::update_task_schedule(&state.pool, id, &schedule)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let scheduled = state
        .coordinator
        .reschedule(id)
        .await
        .map_err(|e| map_scheduler_error(req_id.0.clone(), &e))?;
    tracing::info!(task_id = id, schedule = %schedule, scheduled, "api: schedule updated");

    let data = load_task(&state, &req_id.0, id).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn set_enabled(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<EnabledUpdate>,
) -> Result<Json<ApiResponse<TaskItem>>, ApiError> {
    feedwatch_db::set_task_enabled(&state.pool, id, body.enabled)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let result = if body.enabled {
        state.coordinator.reschedule(id).await
    } else {
        state.coordinator.unschedule(id).await
    };
    result.map_err(|e| map_scheduler_error(req_id.0.clone(), &e))?;
    tracing::info!(task_id = id, enabled = body.enabled, "api: task toggled");

    let data = load_task(&state, &req_id.0, id).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
