//! Dashboard endpoint
//!
//! - GET /api/v1/dashboard - Owner overview across all boards

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::DashboardOverview;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

async fn get_dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DashboardOverview>, ApiError> {
    Ok(Json(state.dashboard_service.overview(user.id()).await?))
}
