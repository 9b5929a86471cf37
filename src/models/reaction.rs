//! Emoji reactions on feedback

use serde::{Deserialize, Serialize};

/// Emojis the public may react with
pub const ALLOWED_EMOJIS: [&str; 8] = ["👍", "👎", "❤️", "😊", "😢", "😮", "🔥", "🎉"];

/// Aggregated count of one emoji on one feedback item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub count: i64,
}

pub fn is_allowed_emoji(emoji: &str) -> bool {
    ALLOWED_EMOJIS.contains(&emoji)
}
