//! Board settings service
//!
//! Owner-only access to a board's notification preferences. Boards that
//! never saved settings report the defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::BoardSettingsRepository;
use crate::models::BoardSettings;
use crate::services::board::{BoardService, BoardServiceError};

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Board not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BoardServiceError> for SettingsServiceError {
    fn from(err: BoardServiceError) -> Self {
        match err {
            BoardServiceError::Validation(msg) => Self::Validation(msg),
            BoardServiceError::NotFound(slug) => Self::NotFound(slug),
            BoardServiceError::Internal(e) => Self::Internal(e),
            other => Self::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// Body of a settings update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub email_notifications: bool,
    #[serde(default)]
    pub notification_email: Option<String>,
}

/// Exactly one `@` with something on both sides
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

pub struct SettingsService {
    boards: Arc<BoardService>,
    repo: Arc<dyn BoardSettingsRepository>,
}

impl SettingsService {
    pub fn new(boards: Arc<BoardService>, repo: Arc<dyn BoardSettingsRepository>) -> Self {
        Self { boards, repo }
    }

    pub async fn get(&self, owner_id: &str, slug: &str) -> Result<BoardSettings, SettingsServiceError> {
        let board = self.boards.get_owned(owner_id, slug).await?;
        Ok(self
            .repo
            .get(board.board.id)
            .await
            .context("Failed to load board settings")?
            .unwrap_or_else(|| BoardSettings::defaults_for(board.board.id)))
    }

    pub async fn save(
        &self,
        owner_id: &str,
        slug: &str,
        input: UpdateSettingsInput,
    ) -> Result<BoardSettings, SettingsServiceError> {
        let notification_email = input
            .notification_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &notification_email {
            if !is_valid_email(email) {
                return Err(SettingsServiceError::Validation(
                    "Please enter a valid email address".to_string(),
                ));
            }
        }

        let board = self.boards.get_owned(owner_id, slug).await?;
        let saved = self
            .repo
            .upsert(&BoardSettings {
                board_id: board.board.id,
                email_notifications: input.email_notifications,
                notification_email,
                updated_at: None,
            })
            .await
            .context("Failed to save board settings")?;

        tracing::debug!("Saved settings for board {}", slug);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{seed_board, setup_pool};
    use crate::db::repositories::SqlxBoardSettingsRepository;
    use crate::services::board::tests::board_service;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("owner@example.com"));
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email("owner.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("owner@"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email("own er@example.com"));
    }

    #[tokio::test]
    async fn test_get_returns_defaults_then_saved_values() {
        let pool = setup_pool().await;
        seed_board(&pool, "owner-1", "acme", &["General"]).await;
        let service = SettingsService::new(
            board_service(&pool),
            SqlxBoardSettingsRepository::boxed(pool.clone()),
        );

        let defaults = service.get("owner-1", "acme").await.unwrap();
        assert!(defaults.email_notifications);
        assert!(defaults.notification_email.is_none());

        let saved = service
            .save(
                "owner-1",
                "acme",
                UpdateSettingsInput {
                    email_notifications: false,
                    notification_email: Some(" owner@example.com ".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(!saved.email_notifications);
        assert!(saved.updated_at.is_some());

        let loaded = service.get("owner-1", "acme").await.unwrap();
        assert_eq!(loaded.notification_email.as_deref(), Some("owner@example.com"));
    }

    #[tokio::test]
    async fn test_save_validates_and_checks_owner() {
        let pool = setup_pool().await;
        seed_board(&pool, "owner-1", "acme", &["General"]).await;
        let service = SettingsService::new(
            board_service(&pool),
            SqlxBoardSettingsRepository::boxed(pool.clone()),
        );
        let input = |email: &str| UpdateSettingsInput {
            email_notifications: true,
            notification_email: Some(email.to_string()),
        };

        assert!(matches!(
            service.save("owner-1", "acme", input("not-an-email")).await,
            Err(SettingsServiceError::Validation(_))
        ));
        assert!(matches!(
            service.save("owner-2", "acme", input("owner@example.com")).await,
            Err(SettingsServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get("owner-2", "acme").await,
            Err(SettingsServiceError::NotFound(_))
        ));
    }
}
