//! Feedback repository
//!
//! Stores public submissions and serves the owner-facing reads: per-board
//! listings joined with category, recent items across boards, and the
//! weekly count used by the dashboard.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Feedback, FeedbackStatus, FeedbackWithCategory, NewFeedback, RecentFeedback};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, feedback: &NewFeedback) -> Result<Feedback>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Feedback>>;

    /// All feedback of a board joined with its category, newest first
    async fn list_by_board(&self, board_id: i64) -> Result<Vec<FeedbackWithCategory>>;

    /// Most recent feedback across every board of one owner
    async fn recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<RecentFeedback>>;

    /// Feedback on the owner's boards created at or after `since`
    async fn count_by_owner_since(&self, owner_id: &str, since: DateTime<Utc>) -> Result<i64>;

    /// Returns false when no feedback has this id
    async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<bool>;
}

pub struct SqlxFeedbackRepository {
    pool: DynDatabasePool,
}

impl SqlxFeedbackRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FeedbackRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FeedbackRepository for SqlxFeedbackRepository {
    async fn create(&self, feedback: &NewFeedback) -> Result<Feedback> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_feedback_sqlite(self.pool.sqlite()?, feedback).await,
            DatabaseDriver::Mysql => create_feedback_mysql(self.pool.mysql()?, feedback).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Feedback>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_feedback_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_feedback_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_by_board(&self, board_id: i64) -> Result<Vec<FeedbackWithCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_board_sqlite(self.pool.sqlite()?, board_id).await,
            DatabaseDriver::Mysql => list_by_board_mysql(self.pool.mysql()?, board_id).await,
        }
    }

    async fn recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<RecentFeedback>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => recent_by_owner_sqlite(self.pool.sqlite()?, owner_id, limit).await,
            DatabaseDriver::Mysql => recent_by_owner_mysql(self.pool.mysql()?, owner_id, limit).await,
        }
    }

    async fn count_by_owner_since(&self, owner_id: &str, since: DateTime<Utc>) -> Result<i64> {
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(COUNT_SINCE_SQL)
                .bind(owner_id)
                .bind(since)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count recent feedback")?
                .try_get::<i64, _>("n")?,
            DatabaseDriver::Mysql => sqlx::query(COUNT_SINCE_SQL)
                .bind(owner_id)
                .bind(since)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count recent feedback")?
                .try_get::<i64, _>("n")?,
        };
        Ok(count)
    }

    async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_STATUS_SQL)
                .bind(status.to_string())
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update feedback status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_STATUS_SQL)
                .bind(status.to_string())
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update feedback status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const SELECT_FEEDBACK_SQL: &str = r#"
    SELECT id, board_id, category_id, title, description, author_name, status, created_at
    FROM feedback
    WHERE id = ?
"#;

const LIST_BY_BOARD_SQL: &str = r#"
    SELECT f.id, f.board_id, f.category_id, f.title, f.description, f.author_name,
           f.status, f.created_at, c.name AS category_name, c.color AS category_color
    FROM feedback f
    LEFT JOIN board_categories c ON c.id = f.category_id
    WHERE f.board_id = ?
    ORDER BY f.created_at DESC, f.id DESC
"#;

const RECENT_BY_OWNER_SQL: &str = r#"
    SELECT f.id, f.board_id, f.category_id, f.title, f.description, f.author_name,
           f.status, f.created_at, c.name AS category_name, c.color AS category_color,
           b.name AS board_name, b.slug AS board_slug
    FROM feedback f
    JOIN boards b ON b.id = f.board_id
    LEFT JOIN board_categories c ON c.id = f.category_id
    WHERE b.owner_id = ?
    ORDER BY f.created_at DESC, f.id DESC
    LIMIT ?
"#;

const COUNT_SINCE_SQL: &str = r#"
    SELECT COUNT(*) AS n
    FROM feedback f
    JOIN boards b ON b.id = f.board_id
    WHERE b.owner_id = ? AND f.created_at >= ?
"#;

const UPDATE_STATUS_SQL: &str = "UPDATE feedback SET status = ? WHERE id = ?";

fn parse_status(value: &str) -> Result<FeedbackStatus> {
    FeedbackStatus::from_str(value).map_err(|e| anyhow::anyhow!(e))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_feedback_sqlite(pool: &SqlitePool, feedback: &NewFeedback) -> Result<Feedback> {
    let now = Utc::now();
    let status = FeedbackStatus::Open;

    let result = sqlx::query(
        r#"
        INSERT INTO feedback (board_id, category_id, title, description, author_name, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(feedback.board_id)
    .bind(feedback.category_id)
    .bind(&feedback.title)
    .bind(&feedback.description)
    .bind(&feedback.author_name)
    .bind(status.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create feedback")?;

    Ok(Feedback {
        id: result.last_insert_rowid(),
        board_id: feedback.board_id,
        category_id: Some(feedback.category_id),
        title: feedback.title.clone(),
        description: feedback.description.clone(),
        author_name: feedback.author_name.clone(),
        status,
        created_at: now,
    })
}

async fn get_feedback_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Feedback>> {
    let row = sqlx::query(SELECT_FEEDBACK_SQL)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get feedback")?;

    row.as_ref().map(row_to_feedback_sqlite).transpose()
}

async fn list_by_board_sqlite(pool: &SqlitePool, board_id: i64) -> Result<Vec<FeedbackWithCategory>> {
    let rows = sqlx::query(LIST_BY_BOARD_SQL)
        .bind(board_id)
        .fetch_all(pool)
        .await
        .context("Failed to list feedback")?;

    rows.iter().map(row_to_feedback_with_category_sqlite).collect()
}

async fn recent_by_owner_sqlite(pool: &SqlitePool, owner_id: &str, limit: i64) -> Result<Vec<RecentFeedback>> {
    let rows = sqlx::query(RECENT_BY_OWNER_SQL)
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent feedback")?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        items.push(RecentFeedback {
            item: row_to_feedback_with_category_sqlite(row)?,
            board_name: row.try_get("board_name")?,
            board_slug: row.try_get("board_slug")?,
        });
    }
    Ok(items)
}

fn row_to_feedback_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Feedback> {
    let status: String = row.try_get("status")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        author_name: row.try_get("author_name")?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_feedback_with_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<FeedbackWithCategory> {
    Ok(FeedbackWithCategory {
        feedback: row_to_feedback_sqlite(row)?,
        category_name: row.try_get("category_name")?,
        category_color: row.try_get("category_color")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_feedback_mysql(pool: &MySqlPool, feedback: &NewFeedback) -> Result<Feedback> {
    let now = Utc::now();
    let status = FeedbackStatus::Open;

    let result = sqlx::query(
        r#"
        INSERT INTO feedback (board_id, category_id, title, description, author_name, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(feedback.board_id)
    .bind(feedback.category_id)
    .bind(&feedback.title)
    .bind(&feedback.description)
    .bind(&feedback.author_name)
    .bind(status.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create feedback")?;

    Ok(Feedback {
        id: result.last_insert_id() as i64,
        board_id: feedback.board_id,
        category_id: Some(feedback.category_id),
        title: feedback.title.clone(),
        description: feedback.description.clone(),
        author_name: feedback.author_name.clone(),
        status,
        created_at: now,
    })
}

async fn get_feedback_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Feedback>> {
    let row = sqlx::query(SELECT_FEEDBACK_SQL)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get feedback")?;

    row.as_ref().map(row_to_feedback_mysql).transpose()
}

async fn list_by_board_mysql(pool: &MySqlPool, board_id: i64) -> Result<Vec<FeedbackWithCategory>> {
    let rows = sqlx::query(LIST_BY_BOARD_SQL)
        .bind(board_id)
        .fetch_all(pool)
        .await
        .context("Failed to list feedback")?;

    rows.iter().map(row_to_feedback_with_category_mysql).collect()
}

async fn recent_by_owner_mysql(pool: &MySqlPool, owner_id: &str, limit: i64) -> Result<Vec<RecentFeedback>> {
    let rows = sqlx::query(RECENT_BY_OWNER_SQL)
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent feedback")?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        items.push(RecentFeedback {
            item: row_to_feedback_with_category_mysql(row)?,
            board_name: row.try_get("board_name")?,
            board_slug: row.try_get("board_slug")?,
        });
    }
    Ok(items)
}

fn row_to_feedback_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Feedback> {
    let status: String = row.try_get("status")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        author_name: row.try_get("author_name")?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_feedback_with_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<FeedbackWithCategory> {
    Ok(FeedbackWithCategory {
        feedback: row_to_feedback_mysql(row)?,
        category_name: row.try_get("category_name")?,
        category_color: row.try_get("category_color")?,
    })
}
