//! Data models
//!
//! Entities as they cross the store boundary (Board, Category, Feedback,
//! Reaction, BoardSettings) plus the input types used to create them.

mod board;
mod category;
mod feedback;
mod reaction;
mod settings;

pub use board::{Board, BoardSummary, BoardWithCategories, NewBoard};
pub use category::{
    is_valid_color, Category, CategorySpec, DEFAULT_CATEGORY_COLORS, DEFAULT_CATEGORY_NAME,
    MAX_CATEGORIES_PER_BOARD,
};
pub use feedback::{Feedback, FeedbackStatus, FeedbackWithCategory, NewFeedback, RecentFeedback};
pub use reaction::{is_allowed_emoji, Reaction, ALLOWED_EMOJIS};
pub use settings::BoardSettings;
