//! Feedback model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feedback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Open,
    Planned,
    InProgress,
    Completed,
    Closed,
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Planned => write!(f, "planned"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid feedback status: {}", s)),
        }
    }
}

/// Feedback entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub board_id: i64,
    /// Null once the category has been removed
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub author_name: Option<String>,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
}

/// Validated feedback ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub board_id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub author_name: Option<String>,
}

/// Feedback joined with the name and color of its category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackWithCategory {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
}

/// Recent feedback across all of an owner's boards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFeedback {
    #[serde(flatten)]
    pub item: FeedbackWithCategory,
    pub board_name: String,
    pub board_slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_display() {
        for status in [
            FeedbackStatus::Open,
            FeedbackStatus::Planned,
            FeedbackStatus::InProgress,
            FeedbackStatus::Completed,
            FeedbackStatus::Closed,
        ] {
            assert_eq!(status.to_string().parse::<FeedbackStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("OPEN".parse::<FeedbackStatus>().unwrap(), FeedbackStatus::Open);
        assert!("archived".parse::<FeedbackStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_display() {
        let json = serde_json::to_string(&FeedbackStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(FeedbackStatus::default(), FeedbackStatus::Open);
    }
}
