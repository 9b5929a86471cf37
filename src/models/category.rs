//! Category model
//!
//! Categories are named, colored tags that classify feedback within a board.
//! Every board is provisioned with at least one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colors handed out to categories in order of creation
pub const DEFAULT_CATEGORY_COLORS: [&str; 8] = [
    "#3B82F6", "#8B5CF6", "#EF4444", "#10B981", "#F59E0B", "#EC4899", "#6366F1", "#14B8A6",
];

/// Upper bound on categories per board
pub const MAX_CATEGORIES_PER_BOARD: usize = 8;

/// Name of the category supplied when the owner defines none
pub const DEFAULT_CATEGORY_NAME: &str = "General";

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    /// Display color, `#RRGGBB`
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A category to be created alongside a new board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    pub color: String,
}

impl CategorySpec {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// The fallback "General" category
    pub fn general() -> Self {
        Self::new(DEFAULT_CATEGORY_NAME, DEFAULT_CATEGORY_COLORS[0])
    }

    /// Palette color for the category at `index`
    pub fn palette_color(index: usize) -> &'static str {
        DEFAULT_CATEGORY_COLORS[index % DEFAULT_CATEGORY_COLORS.len()]
    }
}

/// Check for a `#RRGGBB` hex color
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
