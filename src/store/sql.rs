//! SQL provisioning store
//!
//! Each trait call is one statement (plus a read-back on MySQL, which has no
//! `RETURNING`). The category batch is a single multi-row `INSERT`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;

use super::{ProvisioningStore, StoreError};
use crate::config::DatabaseDriver;
use crate::db::repositories::board::{row_to_board_mysql, row_to_board_sqlite};
use crate::db::repositories::category::{row_to_category_mysql, row_to_category_sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Board, Category, CategorySpec, NewBoard};

/// Provisioning store over the configured SQL database
pub struct SqlxProvisioningStore {
    pool: DynDatabasePool,
}

impl SqlxProvisioningStore {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProvisioningStore> {
        Arc::new(Self::new(pool))
    }

    fn sqlite(&self) -> Result<&SqlitePool, StoreError> {
        Ok(self.pool.sqlite()?)
    }

    fn mysql(&self) -> Result<&MySqlPool, StoreError> {
        Ok(self.pool.mysql()?)
    }
}

#[async_trait]
impl ProvisioningStore for SqlxProvisioningStore {
    async fn insert_board(&self, board: &NewBoard) -> Result<Option<Board>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_board_sqlite(self.sqlite()?, board).await,
            DatabaseDriver::Mysql => insert_board_mysql(self.mysql()?, board).await,
        }
    }

    async fn insert_categories(
        &self,
        board_id: i64,
        categories: &[CategorySpec],
    ) -> Result<Vec<Category>, StoreError> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_categories_sqlite(self.sqlite()?, board_id, categories).await
            }
            DatabaseDriver::Mysql => {
                insert_categories_mysql(self.mysql()?, board_id, categories).await
            }
        }
    }

    async fn delete_board(&self, board_id: i64) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM boards WHERE id = ?")
                    .bind(board_id)
                    .execute(self.sqlite()?)
                    .await?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM boards WHERE id = ?")
                    .bind(board_id)
                    .execute(self.mysql()?)
                    .await?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_board_sqlite(pool: &SqlitePool, board: &NewBoard) -> Result<Option<Board>, StoreError> {
    let row = sqlx::query(
        r#"
        INSERT INTO boards (owner_id, slug, name, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, owner_id, slug, name, description, created_at
        "#,
    )
    .bind(&board.owner_id)
    .bind(&board.slug)
    .bind(&board.name)
    .bind(&board.description)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_board_sqlite).transpose()?)
}

async fn insert_categories_sqlite(
    pool: &SqlitePool,
    board_id: i64,
    categories: &[CategorySpec],
) -> Result<Vec<Category>, StoreError> {
    let now = Utc::now();
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO board_categories (board_id, name, color, created_at) ");
    builder.push_values(categories, |mut row, spec| {
        row.push_bind(board_id)
            .push_bind(spec.name.clone())
            .push_bind(spec.color.clone())
            .push_bind(now);
    });
    builder.push(" RETURNING id, board_id, name, color, created_at");

    let rows = builder.build().fetch_all(pool).await?;
    let mut created = rows
        .iter()
        .map(row_to_category_sqlite)
        .collect::<anyhow::Result<Vec<_>>>()?;
    created.sort_by_key(|c| c.id);
    Ok(created)
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_board_mysql(pool: &MySqlPool, board: &NewBoard) -> Result<Option<Board>, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO boards (owner_id, slug, name, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&board.owner_id)
    .bind(&board.slug)
    .bind(&board.name)
    .bind(&board.description)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let id = result.last_insert_id();
    if id == 0 {
        return Ok(None);
    }

    let row = sqlx::query(
        "SELECT id, owner_id, slug, name, description, created_at FROM boards WHERE id = ?",
    )
    .bind(id as i64)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_board_mysql).transpose()?)
}

async fn insert_categories_mysql(
    pool: &MySqlPool,
    board_id: i64,
    categories: &[CategorySpec],
) -> Result<Vec<Category>, StoreError> {
    let now = Utc::now();
    let mut builder: QueryBuilder<MySql> =
        QueryBuilder::new("INSERT INTO board_categories (board_id, name, color, created_at) ");
    builder.push_values(categories, |mut row, spec| {
        row.push_bind(board_id)
            .push_bind(spec.name.clone())
            .push_bind(spec.color.clone())
            .push_bind(now);
    });
    builder.build().execute(pool).await?;

    // The board is brand new, so every category it has came from this batch
    let rows = sqlx::query(
        "SELECT id, board_id, name, color, created_at FROM board_categories WHERE board_id = ? ORDER BY id",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(row_to_category_mysql)
        .collect::<anyhow::Result<Vec<_>>>()?)
}
