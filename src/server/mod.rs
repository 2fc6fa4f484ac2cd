use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::server::endpoints::{schedule, status};
use crate::types::ServerState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<ServerState>) -> Router {
    let api_router = Router::new()
        .route("/schedule/generate", post(schedule::post_generate))
        .route(
            "/schedule/level/:level_num",
            get(schedule::get_level_schedules),
        )
        .route("/schedule/publish/:id", post(schedule::post_publish))
        .route("/update/:id", put(schedule::put_update_grid))
        .route(
            "/student-schedules/:level",
            get(schedule::get_student_schedules),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .nest("/api", api_router)
        .with_state(app_state)
}
