//! Feedback service
//!
//! Public submission with its validation rules, plus the owner-side
//! listing, status changes, CSV export and analytics for a board.

use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::FeedbackRepository;
use crate::models::{Feedback, FeedbackStatus, FeedbackWithCategory, NewFeedback};
use crate::services::analytics::{self, BoardAnalytics};
use crate::services::board::{BoardService, BoardServiceError};
use crate::services::export::{export_filename, feedback_csv, CsvExport};
use crate::services::notification::NotificationService;

const MIN_CONTENT_LENGTH: usize = 10;
const MAX_CONTENT_LENGTH: usize = 1000;
const MAX_AUTHOR_LENGTH: usize = 100;
const TITLE_LENGTH: usize = 100;
const SPAM_RUN_LENGTH: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BoardServiceError> for FeedbackServiceError {
    fn from(err: BoardServiceError) -> Self {
        match err {
            BoardServiceError::Validation(msg) => Self::Validation(msg),
            BoardServiceError::NotFound(what) => Self::NotFound(format!("board {}", what)),
            BoardServiceError::Internal(e) => Self::Internal(e),
            other => Self::Internal(anyhow!(other.to_string())),
        }
    }
}

/// Body of a public submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitFeedbackInput {
    pub content: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSort {
    #[default]
    Newest,
    Oldest,
}

/// Owner-side listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackFilter {
    /// Case-insensitive match on description, title or author
    #[serde(default)]
    pub search: Option<String>,
    /// Category name, `all` or absent for every category
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: FeedbackSort,
}

/// Any character repeated five or more times in a row
///
/// Line breaks never count towards a run.
pub fn looks_like_spam(content: &str) -> bool {
    let mut previous = None;
    let mut run = 0;
    for c in content.chars() {
        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            previous = None;
            run = 0;
            continue;
        }
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= SPAM_RUN_LENGTH {
            return true;
        }
    }
    false
}

/// Validate a submission against the board's categories
///
/// Returns the normalized author name.
pub fn validate_submission(
    input: &SubmitFeedbackInput,
    board_categories: &[i64],
) -> Result<Option<String>, FeedbackServiceError> {
    let invalid = |msg: &str| FeedbackServiceError::Validation(msg.to_string());

    let trimmed = input.content.trim();
    if trimmed.is_empty() {
        return Err(invalid("Please enter your feedback"));
    }
    let length = trimmed.chars().count();
    if length < MIN_CONTENT_LENGTH {
        return Err(invalid("Feedback must be at least 10 characters long"));
    }
    if length > MAX_CONTENT_LENGTH {
        return Err(invalid("Feedback must be less than 1000 characters"));
    }
    match input.category_id {
        Some(id) if board_categories.contains(&id) => {}
        _ => return Err(invalid("Please select a category")),
    }
    if looks_like_spam(&input.content) {
        return Err(invalid("Please provide meaningful feedback"));
    }

    let author = input
        .author_name
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    if author.map_or(0, |a| a.chars().count()) > MAX_AUTHOR_LENGTH {
        return Err(invalid("Name must be 100 characters or less"));
    }
    Ok(author.map(str::to_string))
}

/// Filter and sort a board's feedback
pub fn apply_filter(
    items: Vec<FeedbackWithCategory>,
    filter: &FeedbackFilter,
) -> Vec<FeedbackWithCategory> {
    let term = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let category = filter
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "all");

    let mut items: Vec<_> = items
        .into_iter()
        .filter(|item| match &term {
            Some(term) => {
                let f = &item.feedback;
                f.description.to_lowercase().contains(term)
                    || f.title.to_lowercase().contains(term)
                    || f.author_name
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(term))
            }
            None => true,
        })
        .filter(|item| match category {
            Some(name) => item.category_name.as_deref() == Some(name),
            None => true,
        })
        .collect();

    match filter.sort {
        FeedbackSort::Newest => items.sort_by(|a, b| {
            b.feedback
                .created_at
                .cmp(&a.feedback.created_at)
                .then(b.feedback.id.cmp(&a.feedback.id))
        }),
        FeedbackSort::Oldest => items.sort_by(|a, b| {
            a.feedback
                .created_at
                .cmp(&b.feedback.created_at)
                .then(a.feedback.id.cmp(&b.feedback.id))
        }),
    }
    items
}

pub struct FeedbackService {
    boards: Arc<BoardService>,
    repo: Arc<dyn FeedbackRepository>,
    notifier: Arc<NotificationService>,
}

impl FeedbackService {
    pub fn new(
        boards: Arc<BoardService>,
        repo: Arc<dyn FeedbackRepository>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            boards,
            repo,
            notifier,
        }
    }

    /// Store a public submission and notify the owner in the background
    pub async fn submit(
        &self,
        slug: &str,
        input: SubmitFeedbackInput,
    ) -> Result<Feedback, FeedbackServiceError> {
        let board = self.boards.get_public(slug).await?;
        let category_ids: Vec<i64> = board.categories.iter().map(|c| c.id).collect();
        let author_name = validate_submission(&input, &category_ids)?;
        let category_id = input
            .category_id
            .ok_or_else(|| FeedbackServiceError::Validation("Please select a category".to_string()))?;

        let feedback = self
            .repo
            .create(&NewFeedback {
                board_id: board.board.id,
                category_id,
                title: input.content.chars().take(TITLE_LENGTH).collect(),
                description: input.content,
                author_name,
            })
            .await
            .context("Failed to create feedback")?;

        tracing::info!("New feedback {} on board {}", feedback.id, board.board.slug);
        self.notifier.spawn_new_feedback(board.board, feedback.clone());
        Ok(feedback)
    }

    /// Feedback on one of the owner's boards
    pub async fn list_for_owner(
        &self,
        owner_id: &str,
        slug: &str,
        filter: &FeedbackFilter,
    ) -> Result<Vec<FeedbackWithCategory>, FeedbackServiceError> {
        let board = self.boards.get_owned(owner_id, slug).await?;
        let items = self
            .repo
            .list_by_board(board.board.id)
            .await
            .context("Failed to list feedback")?;
        Ok(apply_filter(items, filter))
    }

    pub async fn update_status(
        &self,
        owner_id: &str,
        feedback_id: i64,
        status: FeedbackStatus,
    ) -> Result<Feedback, FeedbackServiceError> {
        let not_found = || FeedbackServiceError::NotFound(format!("feedback {}", feedback_id));

        let mut feedback = self
            .repo
            .get_by_id(feedback_id)
            .await
            .context("Failed to get feedback")?
            .ok_or_else(not_found)?;
        self.boards
            .get_owned_by_id(owner_id, feedback.board_id)
            .await
            .map_err(|e| match e {
                BoardServiceError::NotFound(_) => not_found(),
                other => other.into(),
            })?;

        if !self
            .repo
            .update_status(feedback_id, status)
            .await
            .context("Failed to update feedback status")?
        {
            return Err(not_found());
        }
        feedback.status = status;
        Ok(feedback)
    }

    /// The filtered listing rendered as a CSV download
    pub async fn export_csv(
        &self,
        owner_id: &str,
        slug: &str,
        filter: &FeedbackFilter,
        today: NaiveDate,
    ) -> Result<CsvExport, FeedbackServiceError> {
        let items = self.list_for_owner(owner_id, slug, filter).await?;
        Ok(CsvExport {
            filename: export_filename(slug, today),
            content: feedback_csv(&items),
        })
    }

    pub async fn analytics(
        &self,
        owner_id: &str,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<BoardAnalytics, FeedbackServiceError> {
        let board = self.boards.get_owned(owner_id, slug).await?;
        let items = self
            .repo
            .list_by_board(board.board.id)
            .await
            .context("Failed to list feedback")?;
        Ok(analytics::compute(&board.categories, &items, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{seed_board, setup_pool};
    use crate::db::repositories::{SqlxBoardSettingsRepository, SqlxFeedbackRepository};
    use crate::db::DynDatabasePool;
    use crate::services::board::tests::board_service;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn feedback_service(pool: &DynDatabasePool) -> FeedbackService {
        let notifier = Arc::new(NotificationService::new(
            SqlxBoardSettingsRepository::boxed(pool.clone()),
            None,
            "",
        ));
        FeedbackService::new(
            board_service(pool),
            SqlxFeedbackRepository::boxed(pool.clone()),
            notifier,
        )
    }

    fn submission(content: &str, category_id: i64) -> SubmitFeedbackInput {
        SubmitFeedbackInput {
            content: content.to_string(),
            category_id: Some(category_id),
            author_name: None,
        }
    }

    fn validation_message<T: std::fmt::Debug>(result: Result<T, FeedbackServiceError>) -> String {
        match result {
            Err(FeedbackServiceError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn item(id: i64, description: &str, category: &str, author: Option<&str>, hours_ago: i64) -> FeedbackWithCategory {
        let base = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        FeedbackWithCategory {
            feedback: Feedback {
                id,
                board_id: 1,
                category_id: Some(1),
                title: description.to_string(),
                description: description.to_string(),
                author_name: author.map(str::to_string),
                status: FeedbackStatus::Open,
                created_at: base - Duration::hours(hours_ago),
            },
            category_name: Some(category.to_string()),
            category_color: None,
        }
    }

    #[test]
    fn test_looks_like_spam() {
        assert!(looks_like_spam("hellooooo world"));
        assert!(looks_like_spam("!!!!!"));
        assert!(!looks_like_spam("helloooo world"));
        assert!(!looks_like_spam("Great product, would buy again"));
        assert!(!looks_like_spam("line\n\n\n\n\nbreaks"));
    }

    #[test]
    fn test_validation_order() {
        let categories = [7];
        let check = |content: &str, category: Option<i64>| {
            validate_submission(
                &SubmitFeedbackInput {
                    content: content.to_string(),
                    category_id: category,
                    author_name: None,
                },
                &categories,
            )
        };

        assert_eq!(validation_message(check("   ", None)), "Please enter your feedback");
        assert_eq!(
            validation_message(check("too short", None)),
            "Feedback must be at least 10 characters long"
        );
        assert_eq!(
            validation_message(check(&"ab".repeat(501), Some(7))),
            "Feedback must be less than 1000 characters"
        );
        assert_eq!(
            validation_message(check("long enough text", None)),
            "Please select a category"
        );
        assert_eq!(
            validation_message(check("long enough text", Some(8))),
            "Please select a category"
        );
        assert_eq!(
            validation_message(check("aaaaaaaaaaaa", Some(7))),
            "Please provide meaningful feedback"
        );
        assert!(check("long enough text", Some(7)).is_ok());
    }

    #[test]
    fn test_author_is_trimmed_or_null() {
        let mut input = submission("Useful feedback text", 1);
        input.author_name = Some("  Ada  ".to_string());
        assert_eq!(validate_submission(&input, &[1]).unwrap().as_deref(), Some("Ada"));

        input.author_name = Some("   ".to_string());
        assert_eq!(validate_submission(&input, &[1]).unwrap(), None);

        input.author_name = Some("n".repeat(101));
        assert!(validate_submission(&input, &[1]).is_err());
    }

    #[test]
    fn test_apply_filter_search_category_and_sort() {
        let items = vec![
            item(1, "Crash on save", "Bugs", Some("Ada"), 3),
            item(2, "Dark mode please", "Ideas", None, 2),
            item(3, "Another crash", "Bugs", Some("bob"), 1),
        ];

        let newest = apply_filter(items.clone(), &FeedbackFilter::default());
        assert_eq!(newest.iter().map(|i| i.feedback.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let oldest = apply_filter(
            items.clone(),
            &FeedbackFilter {
                sort: FeedbackSort::Oldest,
                ..Default::default()
            },
        );
        assert_eq!(oldest[0].feedback.id, 1);

        let search = apply_filter(
            items.clone(),
            &FeedbackFilter {
                search: Some("CRASH".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(search.len(), 2);

        let by_author = apply_filter(
            items.clone(),
            &FeedbackFilter {
                search: Some("ada".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(by_author.len(), 1);

        let ideas = apply_filter(
            items.clone(),
            &FeedbackFilter {
                category: Some("Ideas".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ideas.len(), 1);

        let all = apply_filter(
            items,
            &FeedbackFilter {
                category: Some("all".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_filter_deserializes_from_query_values() {
        let filter: FeedbackFilter =
            serde_json::from_str(r#"{"search":"x","category":"all","sort":"oldest"}"#).unwrap();
        assert_eq!(filter.sort, FeedbackSort::Oldest);
    }

    #[tokio::test]
    async fn test_submit_stores_feedback() {
        let pool = setup_pool().await;
        let (_, categories) = seed_board(&pool, "owner-1", "acme", &["Bugs", "Ideas"]).await;
        let service = feedback_service(&pool);

        let content = format!("{} tail", "word ".repeat(30));
        let mut input = submission(&content, categories[1].id);
        input.author_name = Some(" Ada ".to_string());

        let feedback = service.submit("acme", input).await.unwrap();
        assert_eq!(feedback.title.chars().count(), 100);
        assert_eq!(feedback.description, content);
        assert_eq!(feedback.author_name.as_deref(), Some("Ada"));
        assert_eq!(feedback.status, FeedbackStatus::Open);
        assert_eq!(feedback.category_id, Some(categories[1].id));
    }

    #[tokio::test]
    async fn test_submit_rejects_foreign_category() {
        let pool = setup_pool().await;
        let (_, _) = seed_board(&pool, "owner-1", "acme", &["Bugs"]).await;
        let (_, other) = seed_board(&pool, "owner-2", "other", &["Bugs"]).await;
        let service = feedback_service(&pool);

        let err = service
            .submit("acme", submission("Valid looking feedback", other[0].id))
            .await;
        assert_eq!(validation_message(err), "Please select a category");
    }

    #[tokio::test]
    async fn test_submit_to_missing_board() {
        let pool = setup_pool().await;
        let service = feedback_service(&pool);

        assert!(matches!(
            service.submit("missing", submission("Valid looking feedback", 1)).await,
            Err(FeedbackServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_listing_export_and_analytics() {
        let pool = setup_pool().await;
        let (_, categories) = seed_board(&pool, "owner-1", "acme", &["Bugs", "Ideas"]).await;
        let service = feedback_service(&pool);
        service
            .submit("acme", submission("The app crashes, every time", categories[0].id))
            .await
            .unwrap();
        service
            .submit("acme", submission("Please add a dark mode", categories[1].id))
            .await
            .unwrap();

        let listed = service
            .list_for_owner("owner-1", "acme", &FeedbackFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        assert!(matches!(
            service.list_for_owner("owner-2", "acme", &FeedbackFilter::default()).await,
            Err(FeedbackServiceError::NotFound(_))
        ));

        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let export = service
            .export_csv("owner-1", "acme", &FeedbackFilter::default(), today)
            .await
            .unwrap();
        assert_eq!(export.filename, "acme-feedback-2024-03-05.csv");
        assert_eq!(export.content.lines().count(), 3);
        assert!(export.content.contains(",Bugs,\"The app crashes, every time\",Anonymous"));

        let stats = service.analytics("owner-1", "acme", Utc::now()).await.unwrap();
        assert_eq!(stats.total_feedback, 2);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.category_distribution.len(), 2);
    }

    #[tokio::test]
    async fn test_update_status_checks_owner() {
        let pool = setup_pool().await;
        let (_, categories) = seed_board(&pool, "owner-1", "acme", &["Bugs"]).await;
        let service = feedback_service(&pool);
        let feedback = service
            .submit("acme", submission("Something is broken here", categories[0].id))
            .await
            .unwrap();

        assert!(matches!(
            service
                .update_status("owner-2", feedback.id, FeedbackStatus::Closed)
                .await,
            Err(FeedbackServiceError::NotFound(_))
        ));

        let updated = service
            .update_status("owner-1", feedback.id, FeedbackStatus::Planned)
            .await
            .unwrap();
        assert_eq!(updated.status, FeedbackStatus::Planned);

        assert!(matches!(
            service.update_status("owner-1", 9999, FeedbackStatus::Planned).await,
            Err(FeedbackServiceError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn five_repeats_are_always_spam(prefix in "[a-z ]{0,20}", c in "[a-z!?.]", suffix in "[a-z ]{0,20}") {
            let content = format!("{}{}{}", prefix, c.repeat(5), suffix);
            prop_assert!(looks_like_spam(&content));
        }

        #[test]
        fn alternating_text_is_never_spam(n in 1usize..200) {
            let content: String = "ab".repeat(n);
            prop_assert!(!looks_like_spam(&content));
        }
    }
}
