//! Database repositories
//!
//! One repository per entity. Boards and their initial categories are
//! written through `crate::store` instead, so the board and category
//! repositories here are read-only.

pub mod board;
pub mod board_settings;
pub mod category;
pub mod feedback;
pub mod reaction;

pub use board::{BoardRepository, SqlxBoardRepository};
pub use board_settings::{BoardSettingsRepository, SqlxBoardSettingsRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use feedback::{FeedbackRepository, SqlxFeedbackRepository};
pub use reaction::{ReactionRepository, SqlxReactionRepository};
