//! Reaction repository
//!
//! Per-emoji counters on feedback. Increments are a single upsert so
//! concurrent reactions never lose a count.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Reaction;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Reactions of one feedback item in the order emojis were first used
    async fn list_by_feedback(&self, feedback_id: i64) -> Result<Vec<Reaction>>;

    /// Add one to the emoji's counter, creating it at 1 if absent
    async fn increment(&self, feedback_id: i64, emoji: &str) -> Result<()>;
}

pub struct SqlxReactionRepository {
    pool: DynDatabasePool,
}

impl SqlxReactionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReactionRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIST_SQL: &str = r#"
    SELECT emoji, count
    FROM feedback_reactions
    WHERE feedback_id = ?
    ORDER BY id
"#;

const INCREMENT_SQLITE: &str = r#"
    INSERT INTO feedback_reactions (feedback_id, emoji, count)
    VALUES (?, ?, 1)
    ON CONFLICT (feedback_id, emoji) DO UPDATE SET count = count + 1
"#;

const INCREMENT_MYSQL: &str = r#"
    INSERT INTO feedback_reactions (feedback_id, emoji, count)
    VALUES (?, ?, 1)
    ON DUPLICATE KEY UPDATE count = count + 1
"#;

#[async_trait]
impl ReactionRepository for SqlxReactionRepository {
    async fn list_by_feedback(&self, feedback_id: i64) -> Result<Vec<Reaction>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_SQL)
                    .bind(feedback_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list reactions")?;
                rows.iter()
                    .map(|row| -> Result<Reaction> {
                        Ok(Reaction {
                            emoji: row.try_get("emoji")?,
                            count: row.try_get("count")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_SQL)
                    .bind(feedback_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list reactions")?;
                rows.iter()
                    .map(|row| -> Result<Reaction> {
                        Ok(Reaction {
                            emoji: row.try_get("emoji")?,
                            count: row.try_get("count")?,
                        })
                    })
                    .collect()
            }
        }
    }

    async fn increment(&self, feedback_id: i64, emoji: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INCREMENT_SQLITE)
                    .bind(feedback_id)
                    .bind(emoji)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to record reaction")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INCREMENT_MYSQL)
                    .bind(feedback_id)
                    .bind(emoji)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to record reaction")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{seed_board, seed_feedback, setup_pool};

    #[tokio::test]
    async fn test_increment_creates_then_counts() {
        let pool = setup_pool().await;
        let repo = SqlxReactionRepository::new(pool.clone());
        let (board, categories) = seed_board(&pool, "owner-1", "product", &["General"]).await;
        let feedback = seed_feedback(&pool, board.id, categories[0].id, "Love the new layout", None).await;

        repo.increment(feedback.id, "👍").await.unwrap();
        repo.increment(feedback.id, "🔥").await.unwrap();
        repo.increment(feedback.id, "👍").await.unwrap();

        let reactions = repo.list_by_feedback(feedback.id).await.unwrap();
        assert_eq!(
            reactions,
            vec![
                Reaction { emoji: "👍".to_string(), count: 2 },
                Reaction { emoji: "🔥".to_string(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_increment_unknown_feedback_fails() {
        let pool = setup_pool().await;
        let repo = SqlxReactionRepository::new(pool);
        assert!(repo.increment(12345, "👍").await.is_err());
    }
}
