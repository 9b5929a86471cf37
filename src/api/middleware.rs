//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Authentication (bearer token or `access_token` cookie)
//! - Per-IP rate limiting of public writes

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::auth::{AuthProvider, AuthUser};
use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxBoardRepository, SqlxBoardSettingsRepository, SqlxCategoryRepository,
    SqlxFeedbackRepository, SqlxReactionRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BoardProvisioner, BoardService, BoardServiceError, DashboardService, FeedbackService,
    FeedbackServiceError, Mailer, NotificationService, ReactionService, ReactionServiceError,
    SettingsService, SettingsServiceError, SubmissionRateLimiter,
};
use crate::store::SqlxProvisioningStore;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub board_service: Arc<BoardService>,
    pub feedback_service: Arc<FeedbackService>,
    pub reaction_service: Arc<ReactionService>,
    pub settings_service: Arc<SettingsService>,
    pub dashboard_service: Arc<DashboardService>,
    pub rate_limiter: Arc<SubmissionRateLimiter>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(
        pool: DynDatabasePool,
        cache: Arc<Cache>,
        auth: Arc<dyn AuthProvider>,
        mailer: Option<Arc<dyn Mailer>>,
        config: &Config,
    ) -> Self {
        let feedback_repo = SqlxFeedbackRepository::boxed(pool.clone());
        let settings_repo = SqlxBoardSettingsRepository::boxed(pool.clone());

        let provisioner = Arc::new(BoardProvisioner::new(
            SqlxProvisioningStore::boxed(pool.clone()),
            cache.clone(),
        ));
        let board_service = Arc::new(BoardService::new(
            SqlxBoardRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            provisioner,
            cache,
        ));
        let notifier = Arc::new(NotificationService::new(
            settings_repo.clone(),
            mailer,
            config.server.public_base_url.clone(),
        ));

        Self {
            auth,
            feedback_service: Arc::new(FeedbackService::new(
                board_service.clone(),
                feedback_repo.clone(),
                notifier,
            )),
            reaction_service: Arc::new(ReactionService::new(
                SqlxReactionRepository::boxed(pool),
                feedback_repo.clone(),
            )),
            settings_service: Arc::new(SettingsService::new(board_service.clone(), settings_repo)),
            dashboard_service: Arc::new(DashboardService::new(board_service.clone(), feedback_repo)),
            rate_limiter: Arc::new(SubmissionRateLimiter::new(config.submission.max_per_minute)),
            board_service,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthUser);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// 429 carrying the budget so clients know when to retry
    pub fn rate_limited(message: impl Into<String>, limit: usize, window_seconds: i64) -> Self {
        Self::with_details(
            "RATE_LIMITED",
            message,
            serde_json::json!({ "limit": limit, "window_seconds": window_seconds }),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Internal details go to the log, not the client
fn internal(context: &str, err: &dyn std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, err);
    ApiError::internal_error(context)
}

impl From<BoardServiceError> for ApiError {
    fn from(err: BoardServiceError) -> Self {
        match &err {
            BoardServiceError::Validation(msg) => Self::validation_error(msg.clone()),
            BoardServiceError::NotFound(_) => Self::not_found("Board not found"),
            BoardServiceError::Provision(e) if e.is_slug_conflict() => Self::conflict(e.to_string()),
            BoardServiceError::Provision(e) => Self::internal_error(e.to_string()),
            BoardServiceError::Internal(e) => internal("Board operation failed", e),
        }
    }
}

impl From<FeedbackServiceError> for ApiError {
    fn from(err: FeedbackServiceError) -> Self {
        match &err {
            FeedbackServiceError::Validation(msg) => Self::validation_error(msg.clone()),
            FeedbackServiceError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            FeedbackServiceError::Internal(e) => internal("Feedback operation failed", e),
        }
    }
}

impl From<ReactionServiceError> for ApiError {
    fn from(err: ReactionServiceError) -> Self {
        match &err {
            ReactionServiceError::Validation(msg) => Self::validation_error(msg.clone()),
            ReactionServiceError::NotFound(_) => Self::not_found("Feedback not found"),
            ReactionServiceError::Internal(e) => internal("Reaction failed", e),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(err: SettingsServiceError) -> Self {
        match &err {
            SettingsServiceError::Validation(msg) => Self::validation_error(msg.clone()),
            SettingsServiceError::NotFound(_) => Self::not_found("Board not found"),
            SettingsServiceError::Internal(e) => internal("Settings operation failed", e),
        }
    }
}

/// Extract the access token from the request
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|cookie| cookie.trim().strip_prefix("access_token="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .auth
        .verify(&token)
        .await
        .map_err(|e| internal("Token verification failed", &e))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Client address from proxy headers, then the socket
pub fn extract_ip_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|ip| ip.trim().parse().ok())
        })
        .or_else(|| peer.map(|addr| addr.ip()))
}

/// Rate limit middleware for anonymous writes
///
/// Requests with no discoverable address share one bucket.
pub async fn limit_public_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = extract_ip_address(request.headers(), peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.rate_limiter.try_acquire(ip).await {
        tracing::debug!("Rate limited public write from {}", ip);
        return Err(ApiError::rate_limited(
            "Too many submissions. Please wait a minute and try again.",
            state.rate_limiter.limit(),
            state.rate_limiter.window_seconds(),
        ));
    }
    Ok(next.run(request).await)
}
