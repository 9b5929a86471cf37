//! Per-board notification settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSettings {
    pub board_id: i64,
    pub email_notifications: bool,
    pub notification_email: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BoardSettings {
    /// Settings reported for a board that never saved any
    pub fn defaults_for(board_id: i64) -> Self {
        Self {
            board_id,
            email_notifications: true,
            notification_email: None,
            updated_at: None,
        }
    }

    /// Address to notify, if notifications are on and one is set
    pub fn notify_address(&self) -> Option<&str> {
        if !self.email_notifications {
            return None;
        }
        self.notification_email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
    }
}
