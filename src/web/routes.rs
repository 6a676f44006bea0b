use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::api::{self, ListingParams, SetResolvedPayload};
use crate::auth::Viewer;
use crate::error::WorkflowError;
use crate::privileges;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/category/:cid", get(category_topics))
        .route("/api/posts/resolved", put(set_resolved))
        .route("/api/posts/:pid/resolved", get(get_resolved))
        .route("/api/topics/:tid/needs-attention", get(needs_attention))
        .route("/api/admin/events", get(recent_events))
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Self::InvalidData => StatusCode::BAD_REQUEST,
            Self::NoPrivileges => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(e) => {
                tracing::error!("Store error: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn category_topics(
    State(state): State<AppState>,
    Viewer(caller): Viewer,
    Path(cid): Path<i64>,
    Query(params): Query<ListingParams>,
) -> Response {
    match api::category_topics(&state.workflow, caller, cid, params).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn set_resolved(
    State(state): State<AppState>,
    Viewer(caller): Viewer,
    payload: Result<Json<SetResolvedPayload>, JsonRejection>,
) -> Response {
    // Guests are told to log in before their payload is looked at.
    if privileges::is_guest(caller.uid) {
        return WorkflowError::NotLoggedIn.into_response();
    }
    let Ok(Json(payload)) = payload else {
        return WorkflowError::InvalidData.into_response();
    };

    match api::set_resolved(&state.workflow, caller, &payload).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_resolved(
    State(state): State<AppState>,
    Viewer(caller): Viewer,
    Path(pid): Path<i64>,
) -> Response {
    match api::get_resolved(&state.workflow, caller, pid).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn needs_attention(State(state): State<AppState>, Path(tid): Path<i64>) -> Response {
    Json(api::needs_attention(&state.workflow, tid).await).into_response()
}

#[derive(Debug, Deserialize)]
struct EventParams {
    limit: Option<i64>,
}

async fn recent_events(
    State(state): State<AppState>,
    Viewer(caller): Viewer,
    Query(params): Query<EventParams>,
) -> Response {
    match api::recent_events(&state.workflow, caller, params.limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => e.into_response(),
    }
}
