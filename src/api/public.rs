//! Public board endpoints
//!
//! No authentication. Writes go through the per-IP rate limiter:
//! - GET /api/v1/public/boards/{slug} - Board with categories
//! - POST /api/v1/public/boards/{slug}/feedback - Submit feedback
//! - GET /api/v1/public/feedback/{id}/reactions - Reaction counts
//! - POST /api/v1/public/feedback/{id}/reactions - Add a reaction

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{self, ApiError, AppState};
use crate::models::{BoardWithCategories, Feedback, Reaction};
use crate::services::SubmitFeedbackInput;

#[derive(Debug, Serialize)]
pub struct SubmitFeedbackResponse {
    pub success: bool,
    pub feedback: Feedback,
}

#[derive(Debug, Serialize)]
pub struct ReactionsResponse {
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Deserialize)]
pub struct AddReactionRequest {
    pub emoji: String,
}

pub fn router(state: AppState) -> Router<AppState> {
    let writes = Router::new()
        .route("/boards/{slug}/feedback", post(submit_feedback))
        .route("/feedback/{id}/reactions", post(add_reaction))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::limit_public_writes,
        ));

    Router::new()
        .route("/boards/{slug}", get(get_board))
        .route("/feedback/{id}/reactions", get(list_reactions))
        .merge(writes)
}

/// GET /api/v1/public/boards/{slug}
async fn get_board(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BoardWithCategories>, ApiError> {
    Ok(Json(state.board_service.get_public(&slug).await?))
}

/// POST /api/v1/public/boards/{slug}/feedback
async fn submit_feedback(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<SubmitFeedbackInput>,
) -> Result<(StatusCode, Json<SubmitFeedbackResponse>), ApiError> {
    let feedback = state.feedback_service.submit(&slug, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            success: true,
            feedback,
        }),
    ))
}

/// GET /api/v1/public/feedback/{id}/reactions
async fn list_reactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReactionsResponse>, ApiError> {
    let reactions = state.reaction_service.list(id).await?;
    Ok(Json(ReactionsResponse { reactions }))
}

/// POST /api/v1/public/feedback/{id}/reactions
async fn add_reaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AddReactionRequest>,
) -> Result<Json<ReactionsResponse>, ApiError> {
    let reactions = state.reaction_service.add(id, &body.emoji).await?;
    Ok(Json(ReactionsResponse { reactions }))
}
