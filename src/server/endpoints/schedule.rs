//! API endpoints for schedule generation, versioning, and publication.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::proposer::ProposerError;
use crate::publish;
use crate::scheduler::{self, ScheduleError};
use crate::server::types::ApiErrorType;
use crate::types::ServerState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub level: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGridRequest {
    pub grid: Option<Value>,
}

/// Maps core errors to status codes. Validation and not-found are caller
/// mistakes; proposer timeouts surface distinctly from other upstream
/// failures; a publish race is retryable.
fn schedule_error_to_response(error: ScheduleError) -> Response {
    let (status, message) = match &error {
        ScheduleError::MissingLevel => (StatusCode::BAD_REQUEST, "Level number is required."),
        ScheduleError::MissingGrid => (StatusCode::BAD_REQUEST, "Grid is required."),
        ScheduleError::InvalidLevel(_) => {
            (StatusCode::BAD_REQUEST, "Invalid academic level provided.")
        }
        ScheduleError::LevelNotFound(_) => {
            (StatusCode::NOT_FOUND, "Level not found in database")
        }
        ScheduleError::ScheduleNotFound(_) => (StatusCode::NOT_FOUND, "Schedule not found"),
        ScheduleError::PublishConflict { .. } => (
            StatusCode::CONFLICT,
            "Schedule was published concurrently - retry the publish",
        ),
        ScheduleError::Proposer(ProposerError::Timeout { .. }) => (
            StatusCode::GATEWAY_TIMEOUT,
            "Schedule proposer timed out",
        ),
        ScheduleError::Proposer(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Schedule proposer failed",
        ),
        ScheduleError::Store(_) | ScheduleError::Serde(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to complete the operation",
        ),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// POST /api/schedule/generate
///
/// Generates and stores version-0 draft schedules for every group of a level.
pub async fn post_generate(
    State(s): State<Arc<ServerState>>,
    Json(body): Json<GenerateRequest>,
) -> Response {
    let Some(level) = body.level else {
        return schedule_error_to_response(ScheduleError::MissingLevel);
    };

    info!("POST /api/schedule/generate - level {level}");

    match scheduler::generate_for_level(&s, level).await {
        Ok(schedules) => (
            StatusCode::OK,
            Json(json!({ "success": true, "schedules": schedules })),
        )
            .into_response(),
        Err(e) => {
            error!("Schedule generation failed: {e}");
            schedule_error_to_response(e)
        }
    }
}

/// GET /api/schedule/level/:level_num
///
/// Returns the latest version of every group's schedule under a level.
pub async fn get_level_schedules(
    Path(level_num): Path<i64>,
    State(s): State<Arc<ServerState>>,
) -> Response {
    info!("GET /api/schedule/level/{level_num}");

    match s.store.find_latest_by_level(level_num) {
        Ok(schedules) if schedules.is_empty() => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No schedule found for this level.",
            None,
        ))
        .into_response(),
        Ok(schedules) => (
            StatusCode::OK,
            Json(json!({ "success": true, "schedules": schedules })),
        )
            .into_response(),
        Err(e) => schedule_error_to_response(ScheduleError::Store(e)),
    }
}

/// PUT /api/update/:id
///
/// Replaces the grid of a stored schedule. Version and publish timestamp are
/// untouched.
pub async fn put_update_grid(
    Path(id): Path<String>,
    State(s): State<Arc<ServerState>>,
    Json(body): Json<UpdateGridRequest>,
) -> Response {
    let Some(grid) = body.grid.filter(|g| !g.is_null()) else {
        return schedule_error_to_response(ScheduleError::MissingGrid);
    };

    info!("PUT /api/update/{id}");

    match s.store.update_grid(&id, &grid) {
        Ok(false) => schedule_error_to_response(ScheduleError::ScheduleNotFound(id)),
        Ok(true) => match s.store.find_by_id(&id) {
            Ok(Some(schedule)) => (
                StatusCode::OK,
                Json(json!({ "success": true, "schedule": schedule })),
            )
                .into_response(),
            Ok(None) => schedule_error_to_response(ScheduleError::ScheduleNotFound(id)),
            Err(e) => schedule_error_to_response(ScheduleError::Store(e)),
        },
        Err(e) => schedule_error_to_response(ScheduleError::Store(e)),
    }
}

/// POST /api/schedule/publish/:id
///
/// Promotes a schedule to its next version and fans out notifications.
pub async fn post_publish(
    Path(id): Path<String>,
    State(s): State<Arc<ServerState>>,
) -> Response {
    info!("POST /api/schedule/publish/{id}");

    match publish::publish_schedule(&s.store, &id) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!(
                    "Schedule version {} published successfully.",
                    outcome.version
                ),
                "recipients": outcome.recipients,
                "version": outcome.version,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Publish failed for {id}: {e}");
            schedule_error_to_response(e)
        }
    }
}

/// GET /api/student-schedules/:level
///
/// Student-facing listing: every schedule for a level at version 2 or higher,
/// newest version first.
pub async fn get_student_schedules(
    Path(level): Path<i64>,
    State(s): State<Arc<ServerState>>,
) -> Response {
    if !(1..=8).contains(&level) {
        return schedule_error_to_response(ScheduleError::InvalidLevel(level));
    }

    info!("GET /api/student-schedules/{level}");

    match s.store.find_by_level_min_version(level, 2) {
        Ok(schedules) if schedules.is_empty() => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No published schedule found for this level.",
            None,
        ))
        .into_response(),
        Ok(schedules) => (
            StatusCode::OK,
            Json(json!({ "level": level, "schedules": schedules })),
        )
            .into_response(),
        Err(e) => schedule_error_to_response(ScheduleError::Store(e)),
    }
}
