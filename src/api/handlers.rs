//! HTTP request handlers for the exeat engine API.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::request::{
    ActiveLeavesQuery, AdminCommandBody, DepartureBody, LeaveRequestBody, received_or_now,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/leave-requests", post(leave_request_handler))
        .route("/admin-commands", post(admin_command_handler))
        .route("/departures", post(departure_handler))
        .route(
            "/students/:admin_number/active-leaves",
            get(active_leaves_handler),
        )
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

/// Turns a body extraction failure into a 400 with an [`ApiError`].
fn rejection_response(rejection: JsonRejection, correlation_id: Uuid) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") || body_text.contains("unknown variant") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Runs synchronous engine or store work on the blocking pool.
///
/// A panic inside `work` becomes a 500.
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        warn!(error = %err, "Blocking task failed");
        ApiErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new("INTERNAL_ERROR", "Request could not be completed"),
        }
        .into_response()
    })
}

/// Handler for GET /health.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Handler for POST /leave-requests.
///
/// Always answers 200 with a decision once the body parses; rejections and
/// processing errors are decisions too.
async fn leave_request_handler(
    State(state): State<AppState>,
    payload: Result<Json<LeaveRequestBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(rejection, correlation_id),
    };

    let (message, now) = body.into_parts();
    let start_time = Instant::now();
    let decision = match run_blocking(move || state.engine().process(&message, now)).await {
        Ok(decision) => decision,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        status = %decision.status,
        duration_us = start_time.elapsed().as_micros(),
        "Leave request processed"
    );
    json_response(StatusCode::OK, decision)
}

/// Handler for POST /admin-commands.
async fn admin_command_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdminCommandBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(rejection, correlation_id),
    };

    let now = received_or_now(body.received_at);
    let outcome = run_blocking(move || state.admin().execute(&body.sender, &body.text, now)).await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        success = outcome.is_success(),
        "Administrator command processed"
    );
    json_response(StatusCode::OK, outcome)
}

/// Handler for POST /departures.
async fn departure_handler(
    State(state): State<AppState>,
    payload: Result<Json<DepartureBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(rejection, correlation_id),
    };
    if body.driver_id.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            ApiError::validation_error("driver_id must not be empty"),
        );
    }

    let at = received_or_now(body.departed_at);
    let admin_number = body.admin_number.clone();
    let recorded = run_blocking(move || {
        state
            .store()
            .record_departure(&body.admin_number, at, body.driver_id.trim())
    })
    .await;
    let recorded = match recorded {
        Ok(recorded) => recorded,
        Err(response) => return response,
    };

    match recorded {
        Ok(Some(entry)) => {
            info!(
                correlation_id = %correlation_id,
                admin_number = %admin_number,
                entry_id = %entry.entry_id,
                "Departure recorded"
            );
            json_response(StatusCode::OK, entry)
        }
        Ok(None) => json_response(
            StatusCode::NOT_FOUND,
            ApiError::no_active_leave(&admin_number),
        ),
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Departure failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /students/:admin_number/active-leaves.
async fn active_leaves_handler(
    State(state): State<AppState>,
    Path(admin_number): Path<String>,
    Query(query): Query<ActiveLeavesQuery>,
) -> Response {
    let at = received_or_now(query.at);
    let lookup = {
        let admin_number = admin_number.clone();
        run_blocking(move || state.store().active_leaves(&admin_number, at)).await
    };
    let lookup = match lookup {
        Ok(lookup) => lookup,
        Err(response) => return response,
    };

    match lookup {
        Ok(entries) => json_response(StatusCode::OK, entries),
        Err(err) => {
            warn!(admin_number = %admin_number, error = %err, "Active leave lookup failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}
