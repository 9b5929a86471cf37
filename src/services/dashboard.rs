//! Owner dashboard

use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::repositories::FeedbackRepository;
use crate::models::{BoardSummary, RecentFeedback};
use crate::services::board::{BoardService, BoardServiceError};

const RECENT_FEEDBACK_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub boards: Vec<BoardSummary>,
    pub recent_feedback: Vec<RecentFeedback>,
    pub total_boards: i64,
    pub total_feedback: i64,
    pub this_week_feedback: i64,
    /// Distinct named authors among the recent items
    pub active_authors: i64,
}

pub struct DashboardService {
    boards: Arc<BoardService>,
    feedback: Arc<dyn FeedbackRepository>,
}

impl DashboardService {
    pub fn new(boards: Arc<BoardService>, feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self { boards, feedback }
    }

    pub async fn overview(&self, owner_id: &str) -> Result<DashboardOverview, BoardServiceError> {
        let boards = self.boards.list_owned(owner_id).await?;
        let recent_feedback = self
            .feedback
            .recent_by_owner(owner_id, RECENT_FEEDBACK_LIMIT)
            .await
            .context("Failed to list recent feedback")?;
        let this_week_feedback = self
            .feedback
            .count_by_owner_since(owner_id, Utc::now() - Duration::weeks(1))
            .await
            .context("Failed to count recent feedback")?;

        let active_authors = recent_feedback
            .iter()
            .filter_map(|f| f.item.feedback.author_name.as_deref())
            .filter(|name| !name.is_empty())
            .collect::<HashSet<_>>()
            .len() as i64;

        Ok(DashboardOverview {
            total_boards: boards.len() as i64,
            total_feedback: boards.iter().map(|b| b.feedback_count).sum(),
            boards,
            recent_feedback,
            this_week_feedback,
            active_authors,
        })
    }
}
