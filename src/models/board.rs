//! Board model
//!
//! A board is a public, slugged feedback surface owned by exactly one user
//! account. Owner ids come from the managed auth service and are opaque
//! strings here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// Board entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub id: i64,
    /// Auth-provider user id of the owner
    pub owner_id: String,
    /// URL slug, unique across the store
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Board {
    /// Path of the public submission page for this board
    pub fn public_path(&self) -> String {
        format!("/boards/{}", self.slug)
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Fields for a board that has not been persisted yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBoard {
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Board together with its categories (public page, owner views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardWithCategories {
    #[serde(flatten)]
    pub board: Board,
    pub categories: Vec<Category>,
}

impl BoardWithCategories {
    /// Find one of this board's categories by id
    pub fn category(&self, category_id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}

/// Board row for the owner's board list and dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSummary {
    #[serde(flatten)]
    pub board: Board,
    pub feedback_count: i64,
    pub categories: Vec<Category>,
}
