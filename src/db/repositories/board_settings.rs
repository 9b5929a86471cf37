//! Board settings repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::BoardSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait BoardSettingsRepository: Send + Sync {
    async fn get(&self, board_id: i64) -> Result<Option<BoardSettings>>;

    /// Insert or replace the settings row of a board
    async fn upsert(&self, settings: &BoardSettings) -> Result<BoardSettings>;
}

pub struct SqlxBoardSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxBoardSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BoardSettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

const GET_SQL: &str = r#"
    SELECT board_id, email_notifications, notification_email, updated_at
    FROM board_settings
    WHERE board_id = ?
"#;

const UPSERT_SQLITE: &str = r#"
    INSERT INTO board_settings (board_id, email_notifications, notification_email, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (board_id) DO UPDATE SET
        email_notifications = excluded.email_notifications,
        notification_email = excluded.notification_email,
        updated_at = excluded.updated_at
"#;

const UPSERT_MYSQL: &str = r#"
    INSERT INTO board_settings (board_id, email_notifications, notification_email, updated_at)
    VALUES (?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        email_notifications = VALUES(email_notifications),
        notification_email = VALUES(notification_email),
        updated_at = VALUES(updated_at)
"#;

#[async_trait]
impl BoardSettingsRepository for SqlxBoardSettingsRepository {
    async fn get(&self, board_id: i64) -> Result<Option<BoardSettings>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(GET_SQL)
                    .bind(board_id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get board settings")?;
                match row {
                    Some(row) => Ok(Some(BoardSettings {
                        board_id: row.try_get("board_id")?,
                        email_notifications: row.try_get("email_notifications")?,
                        notification_email: row.try_get("notification_email")?,
                        updated_at: row.try_get("updated_at")?,
                    })),
                    None => Ok(None),
                }
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(GET_SQL)
                    .bind(board_id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get board settings")?;
                match row {
                    Some(row) => Ok(Some(BoardSettings {
                        board_id: row.try_get("board_id")?,
                        email_notifications: row.try_get("email_notifications")?,
                        notification_email: row.try_get("notification_email")?,
                        updated_at: row.try_get("updated_at")?,
                    })),
                    None => Ok(None),
                }
            }
        }
    }

    async fn upsert(&self, settings: &BoardSettings) -> Result<BoardSettings> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPSERT_SQLITE)
                    .bind(settings.board_id)
                    .bind(settings.email_notifications)
                    .bind(&settings.notification_email)
                    .bind(now)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to save board settings")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPSERT_MYSQL)
                    .bind(settings.board_id)
                    .bind(settings.email_notifications)
                    .bind(&settings.notification_email)
                    .bind(now)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to save board settings")?;
            }
        }

        Ok(BoardSettings {
            updated_at: Some(now),
            ..settings.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{seed_board, setup_pool};

    #[tokio::test]
    async fn test_get_missing_settings() {
        let pool = setup_pool().await;
        let repo = SqlxBoardSettingsRepository::new(pool.clone());
        let (board, _) = seed_board(&pool, "owner-1", "product", &["General"]).await;

        assert!(repo.get(board.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let pool = setup_pool().await;
        let repo = SqlxBoardSettingsRepository::new(pool.clone());
        let (board, _) = seed_board(&pool, "owner-1", "product", &["General"]).await;

        let mut settings = BoardSettings::defaults_for(board.id);
        settings.notification_email = Some("owner@example.com".to_string());
        let saved = repo.upsert(&settings).await.unwrap();
        assert!(saved.updated_at.is_some());

        settings.email_notifications = false;
        settings.notification_email = None;
        repo.upsert(&settings).await.unwrap();

        let stored = repo.get(board.id).await.unwrap().unwrap();
        assert!(!stored.email_notifications);
        assert!(stored.notification_email.is_none());
    }
}
