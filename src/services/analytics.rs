//! Board analytics
//!
//! Pure aggregation over a board's categories and feedback at a given
//! instant. Nothing here touches the database.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{Category, FeedbackWithCategory};

const TREND_DAYS: i64 = 30;
const TREND_WEEKS: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub color: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    /// Short label such as `Mar 05`
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    pub label: String,
    pub count: i64,
}

/// Aggregated statistics for one board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardAnalytics {
    pub total_feedback: i64,
    pub this_week: i64,
    pub unique_authors: i64,
    pub average_length: i64,
    pub category_distribution: Vec<CategoryCount>,
    pub daily_trend: Vec<DailyCount>,
    pub weekly_trend: Vec<WeeklyCount>,
}

/// Compute analytics for a board as seen at `now`
pub fn compute(
    categories: &[Category],
    feedback: &[FeedbackWithCategory],
    now: DateTime<Utc>,
) -> BoardAnalytics {
    let category_distribution = categories
        .iter()
        .map(|category| CategoryCount {
            name: category.name.clone(),
            color: category.color.clone(),
            count: feedback
                .iter()
                .filter(|f| f.category_name.as_deref() == Some(category.name.as_str()))
                .count() as i64,
        })
        .collect();

    let today = now.date_naive();
    let daily_trend = (0..TREND_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            DailyCount {
                date,
                label: date.format("%b %d").to_string(),
                count: feedback
                    .iter()
                    .filter(|f| f.feedback.created_at.date_naive() == date)
                    .count() as i64,
            }
        })
        .collect();

    let weekly_trend = (0..TREND_WEEKS)
        .rev()
        .map(|weeks_ago| {
            let end = now - Duration::weeks(weeks_ago);
            let start = now - Duration::weeks(weeks_ago + 1);
            WeeklyCount {
                label: format!("Week {}", TREND_WEEKS - weeks_ago),
                count: feedback
                    .iter()
                    .filter(|f| f.feedback.created_at >= start && f.feedback.created_at <= end)
                    .count() as i64,
            }
        })
        .collect();

    let week_ago = now - Duration::weeks(1);
    let this_week = feedback
        .iter()
        .filter(|f| f.feedback.created_at > week_ago)
        .count() as i64;

    let unique_authors = feedback
        .iter()
        .filter_map(|f| f.feedback.author_name.as_deref())
        .filter(|name| !name.is_empty())
        .collect::<HashSet<_>>()
        .len() as i64;

    let average_length = if feedback.is_empty() {
        0
    } else {
        let total: usize = feedback
            .iter()
            .map(|f| f.feedback.description.chars().count())
            .sum();
        (total as f64 / feedback.len() as f64).round() as i64
    };

    BoardAnalytics {
        total_feedback: feedback.len() as i64,
        this_week,
        unique_authors,
        average_length,
        category_distribution,
        daily_trend,
        weekly_trend,
    }
}
