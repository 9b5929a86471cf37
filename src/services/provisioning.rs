//! Board provisioning
//!
//! Creates a board and its initial categories as one logical unit against a
//! store that only offers discrete writes:
//!
//! 1. insert the board and read the row back;
//! 2. insert every category in one batch;
//! 3. if step 2 fails or creates nothing, delete the board again.
//!
//! The compensating delete is best effort. When it fails the caller still
//! sees the category error, but the orphaned board is logged at `error!`
//! and the returned variant says so.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::{board_key, Cache};
use crate::models::{Board, CategorySpec, NewBoard};
use crate::store::{ProvisioningStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The store rejected the board insert
    #[error("{0}")]
    BoardCreation(StoreError),

    /// The board insert reported success but returned no row
    #[error("Failed to create board")]
    MissingBoardId,

    #[error("Failed to create category records: {message}")]
    CategoryCreation { message: String },

    #[error("Failed to create category records: no rows were created")]
    NoCategoriesCreated,

    /// Category insert failed and so did the rollback of the board
    #[error("{category_error}")]
    CompensationFailed {
        board_id: i64,
        category_error: String,
        compensation_error: StoreError,
    },
}

impl ProvisionError {
    /// The board insert hit the slug uniqueness constraint
    pub fn is_slug_conflict(&self) -> bool {
        matches!(self, Self::BoardCreation(err) if err.is_unique_violation())
    }
}

/// Tagged result handed to the caller of the provisioning flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProvisionOutcome {
    pub fn succeeded(board: Board) -> Self {
        Self {
            success: true,
            board: Some(board),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            board: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<Board, ProvisionError>> for ProvisionOutcome {
    fn from(result: Result<Board, ProvisionError>) -> Self {
        match result {
            Ok(board) => Self::succeeded(board),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Runs the board provisioning flow against an injected store
pub struct BoardProvisioner {
    store: Arc<dyn ProvisioningStore>,
    cache: Arc<Cache>,
}

impl BoardProvisioner {
    pub fn new(store: Arc<dyn ProvisioningStore>, cache: Arc<Cache>) -> Self {
        Self { store, cache }
    }

    /// Create `board` with `categories`
    ///
    /// Inputs are assumed validated by the caller. Nothing is remembered
    /// between calls: retrying after a failure attempts a fresh board insert.
    pub async fn provision(
        &self,
        board: NewBoard,
        categories: Vec<CategorySpec>,
    ) -> Result<Board, ProvisionError> {
        let created = match self.store.insert_board(&board).await {
            Ok(Some(created)) => created,
            Ok(None) => {
                warn!("Board insert for '{}' returned no row", board.slug);
                return Err(ProvisionError::MissingBoardId);
            }
            Err(err) => {
                warn!(
                    "Board insert for '{}' failed ({}, code {}): {}",
                    board.slug, err.kind, err.code, err
                );
                return Err(ProvisionError::BoardCreation(err));
            }
        };

        let categories: Vec<CategorySpec> = categories
            .into_iter()
            .map(|spec| CategorySpec::new(spec.name.trim(), spec.color))
            .collect();

        let failure = match self.store.insert_categories(created.id, &categories).await {
            Ok(rows) if !rows.is_empty() => {
                self.cache.delete(&board_key(&created.slug)).await;
                info!(
                    "Provisioned board '{}' (id {}) with {} categories",
                    created.slug,
                    created.id,
                    rows.len()
                );
                return Ok(created);
            }
            Ok(_) => ProvisionError::NoCategoriesCreated,
            Err(err) => ProvisionError::CategoryCreation {
                message: err.message,
            },
        };

        Err(self.compensate(&created, failure).await)
    }

    /// Delete a board whose categories could not be created
    async fn compensate(&self, board: &Board, failure: ProvisionError) -> ProvisionError {
        let outcome = self.store.delete_board(board.id).await;
        self.cache.delete(&board_key(&board.slug)).await;

        match outcome {
            Ok(()) => {
                warn!(
                    "Rolled back board '{}' (id {}): {}",
                    board.slug, board.id, failure
                );
                failure
            }
            Err(compensation_error) => {
                error!(
                    "Compensating delete of board '{}' (id {}) failed, board is left without categories: {} (after: {})",
                    board.slug, board.id, compensation_error, failure
                );
                ProvisionError::CompensationFailed {
                    board_id: board.id,
                    category_error: failure.to_string(),
                    compensation_error,
                }
            }
        }
    }
}
