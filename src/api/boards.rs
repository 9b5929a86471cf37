//! Owner board endpoints
//!
//! Handles HTTP requests for the signed-in owner:
//! - POST /api/v1/boards - Create a board with its categories
//! - GET /api/v1/boards - List the owner's boards
//! - GET /api/v1/boards/{slug} - Board with categories
//! - GET /api/v1/boards/{slug}/feedback - Filtered feedback listing
//! - GET /api/v1/boards/{slug}/feedback/export - CSV download
//! - GET /api/v1/boards/{slug}/analytics - Aggregated statistics
//! - GET/PUT /api/v1/boards/{slug}/settings - Notification settings
//! - PUT /api/v1/feedback/{id}/status - Change a feedback status

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    BoardSettings, BoardSummary, BoardWithCategories, Feedback, FeedbackStatus,
    FeedbackWithCategory,
};
use crate::services::{
    BoardAnalytics, BoardServiceError, CreateBoardInput, FeedbackFilter, ProvisionOutcome,
    UpdateSettingsInput,
};

#[derive(Debug, Serialize)]
pub struct BoardListResponse {
    pub boards: Vec<BoardSummary>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub feedback: Vec<FeedbackWithCategory>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: FeedbackStatus,
}

/// Build the owner router; every route expects `require_auth` in front
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/{slug}", get(get_board))
        .route("/boards/{slug}/feedback", get(list_feedback))
        .route("/boards/{slug}/feedback/export", get(export_feedback))
        .route("/boards/{slug}/analytics", get(get_analytics))
        .route("/boards/{slug}/settings", get(get_settings).put(update_settings))
        .route("/feedback/{id}/status", put(update_feedback_status))
}

/// POST /api/v1/boards
///
/// Always answers with a `ProvisionOutcome`; the status code tells a
/// rejected input from a taken slug from a store failure.
async fn create_board(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateBoardInput>,
) -> (StatusCode, Json<ProvisionOutcome>) {
    match state.board_service.create_board(user.id(), input).await {
        Ok(board) => (StatusCode::CREATED, Json(ProvisionOutcome::succeeded(board))),
        Err(err) => {
            let status = match &err {
                BoardServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                BoardServiceError::Provision(e) if e.is_slug_conflict() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ProvisionOutcome::failed(err.to_string())))
        }
    }
}

/// GET /api/v1/boards
async fn list_boards(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<BoardListResponse>, ApiError> {
    let boards = state.board_service.list_owned(user.id()).await?;
    Ok(Json(BoardListResponse { boards }))
}

/// GET /api/v1/boards/{slug}
async fn get_board(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<BoardWithCategories>, ApiError> {
    Ok(Json(state.board_service.get_owned(user.id(), &slug).await?))
}

/// GET /api/v1/boards/{slug}/feedback?search=&category=&sort=
async fn list_feedback(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Query(filter): Query<FeedbackFilter>,
) -> Result<Json<FeedbackListResponse>, ApiError> {
    let feedback = state
        .feedback_service
        .list_for_owner(user.id(), &slug, &filter)
        .await?;
    Ok(Json(FeedbackListResponse {
        total: feedback.len(),
        feedback,
    }))
}

/// GET /api/v1/boards/{slug}/feedback/export
async fn export_feedback(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Query(filter): Query<FeedbackFilter>,
) -> Result<Response, ApiError> {
    let export = state
        .feedback_service
        .export_csv(user.id(), &slug, &filter, Utc::now().date_naive())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.content,
    )
        .into_response())
}

/// GET /api/v1/boards/{slug}/analytics
async fn get_analytics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<BoardAnalytics>, ApiError> {
    Ok(Json(
        state
            .feedback_service
            .analytics(user.id(), &slug, Utc::now())
            .await?,
    ))
}

/// GET /api/v1/boards/{slug}/settings
async fn get_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<BoardSettings>, ApiError> {
    Ok(Json(state.settings_service.get(user.id(), &slug).await?))
}

/// PUT /api/v1/boards/{slug}/settings
async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<Json<BoardSettings>, ApiError> {
    Ok(Json(state.settings_service.save(user.id(), &slug, input).await?))
}

/// PUT /api/v1/feedback/{id}/status
async fn update_feedback_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Feedback>, ApiError> {
    Ok(Json(
        state
            .feedback_service
            .update_status(user.id(), id, body.status)
            .await?,
    ))
}
