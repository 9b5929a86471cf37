//! Board repository
//!
//! Read access to boards. Boards are written only by the provisioning store
//! (`crate::store`), which owns the insert and the compensating delete.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Board;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Board repository trait
#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Board>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Board>>;

    /// Boards of one owner with their feedback counts, newest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<(Board, i64)>>;
}

/// SQLx-based board repository
pub struct SqlxBoardRepository {
    pool: DynDatabasePool,
}

impl SqlxBoardRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BoardRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BoardRepository for SqlxBoardRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Board>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_board_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_board_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Board>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_board_by_slug_sqlite(self.pool.sqlite()?, slug).await,
            DatabaseDriver::Mysql => get_board_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<(Board, i64)>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_boards_by_owner_sqlite(self.pool.sqlite()?, owner_id).await,
            DatabaseDriver::Mysql => list_boards_by_owner_mysql(self.pool.mysql()?, owner_id).await,
        }
    }
}

const LIST_BY_OWNER_SQL: &str = r#"
    SELECT b.id, b.owner_id, b.slug, b.name, b.description, b.created_at,
           (SELECT COUNT(*) FROM feedback f WHERE f.board_id = b.id) AS feedback_count
    FROM boards b
    WHERE b.owner_id = ?
    ORDER BY b.created_at DESC, b.id DESC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_board_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Board>> {
    let row = sqlx::query(
        "SELECT id, owner_id, slug, name, description, created_at FROM boards WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get board by ID")?;

    row.as_ref().map(row_to_board_sqlite).transpose()
}

async fn get_board_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Board>> {
    let row = sqlx::query(
        "SELECT id, owner_id, slug, name, description, created_at FROM boards WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get board by slug")?;

    row.as_ref().map(row_to_board_sqlite).transpose()
}

async fn list_boards_by_owner_sqlite(pool: &SqlitePool, owner_id: &str) -> Result<Vec<(Board, i64)>> {
    let rows = sqlx::query(LIST_BY_OWNER_SQL)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list boards")?;

    let mut boards = Vec::with_capacity(rows.len());
    for row in rows {
        let count: i64 = row.try_get("feedback_count")?;
        boards.push((row_to_board_sqlite(&row)?, count));
    }
    Ok(boards)
}

pub(crate) fn row_to_board_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Board> {
    Ok(Board {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_board_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Board>> {
    let row = sqlx::query(
        "SELECT id, owner_id, slug, name, description, created_at FROM boards WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get board by ID")?;

    row.as_ref().map(row_to_board_mysql).transpose()
}

async fn get_board_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Board>> {
    let row = sqlx::query(
        "SELECT id, owner_id, slug, name, description, created_at FROM boards WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get board by slug")?;

    row.as_ref().map(row_to_board_mysql).transpose()
}

async fn list_boards_by_owner_mysql(pool: &MySqlPool, owner_id: &str) -> Result<Vec<(Board, i64)>> {
    let rows = sqlx::query(LIST_BY_OWNER_SQL)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list boards")?;

    let mut boards = Vec::with_capacity(rows.len());
    for row in rows {
        let count: i64 = row.try_get("feedback_count")?;
        boards.push((row_to_board_mysql(&row)?, count));
    }
    Ok(boards)
}

pub(crate) fn row_to_board_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Board> {
    Ok(Board {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}
