//! Category repository
//!
//! Read access to board categories.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Categories of one board in creation order
    async fn list_by_board(&self, board_id: i64) -> Result<Vec<Category>>;

    /// Categories of every board the owner has, in creation order
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Category>>;
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn list_by_board(&self, board_id: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_board_sqlite(self.pool.sqlite()?, board_id).await,
            DatabaseDriver::Mysql => list_by_board_mysql(self.pool.mysql()?, board_id).await,
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_owner_sqlite(self.pool.sqlite()?, owner_id).await,
            DatabaseDriver::Mysql => list_by_owner_mysql(self.pool.mysql()?, owner_id).await,
        }
    }
}

const LIST_BY_BOARD_SQL: &str = r#"
    SELECT id, board_id, name, color, created_at
    FROM board_categories
    WHERE board_id = ?
    ORDER BY id
"#;

const LIST_BY_OWNER_SQL: &str = r#"
    SELECT c.id, c.board_id, c.name, c.color, c.created_at
    FROM board_categories c
    JOIN boards b ON b.id = c.board_id
    WHERE b.owner_id = ?
    ORDER BY c.board_id, c.id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_by_board_sqlite(pool: &SqlitePool, board_id: i64) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_BOARD_SQL)
        .bind(board_id)
        .fetch_all(pool)
        .await
        .context("Failed to list board categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn list_by_owner_sqlite(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_OWNER_SQL)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list owner categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

pub(crate) fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_by_board_mysql(pool: &MySqlPool, board_id: i64) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_BOARD_SQL)
        .bind(board_id)
        .fetch_all(pool)
        .await
        .context("Failed to list board categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn list_by_owner_mysql(pool: &MySqlPool, owner_id: &str) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_OWNER_SQL)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list owner categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

pub(crate) fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}
