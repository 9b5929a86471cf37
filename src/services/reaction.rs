//! Reaction service

use anyhow::Context;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::{FeedbackRepository, ReactionRepository};
use crate::models::{is_allowed_emoji, Reaction};

#[derive(Debug, Error)]
pub enum ReactionServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Feedback not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct ReactionService {
    reactions: Arc<dyn ReactionRepository>,
    feedback: Arc<dyn FeedbackRepository>,
}

impl ReactionService {
    pub fn new(reactions: Arc<dyn ReactionRepository>, feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self { reactions, feedback }
    }

    pub async fn list(&self, feedback_id: i64) -> Result<Vec<Reaction>, ReactionServiceError> {
        self.ensure_feedback(feedback_id).await?;
        Ok(self
            .reactions
            .list_by_feedback(feedback_id)
            .await
            .context("Failed to list reactions")?)
    }

    /// Count one more `emoji` on a feedback item and return the new totals
    pub async fn add(&self, feedback_id: i64, emoji: &str) -> Result<Vec<Reaction>, ReactionServiceError> {
        if !is_allowed_emoji(emoji) {
            return Err(ReactionServiceError::Validation(format!(
                "Unsupported reaction: {}",
                emoji
            )));
        }
        self.ensure_feedback(feedback_id).await?;

        self.reactions
            .increment(feedback_id, emoji)
            .await
            .context("Failed to add reaction")?;
        Ok(self
            .reactions
            .list_by_feedback(feedback_id)
            .await
            .context("Failed to list reactions")?)
    }

    async fn ensure_feedback(&self, feedback_id: i64) -> Result<(), ReactionServiceError> {
        self.feedback
            .get_by_id(feedback_id)
            .await
            .context("Failed to get feedback")?
            .map(|_| ())
            .ok_or(ReactionServiceError::NotFound(feedback_id))
    }
}
