//! Board service
//!
//! Caller-side half of board creation (slug generation, input validation,
//! category preparation) plus the owner and public board reads.
//!
//! Slug availability is not queried before a board is created. The unique
//! index on `boards.slug` decides and a violation surfaces as a slug
//! conflict.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::{board_key, Cache};
use crate::db::repositories::{BoardRepository, CategoryRepository};
use crate::models::{
    is_valid_color, Board, BoardSummary, BoardWithCategories, CategorySpec, NewBoard,
    MAX_CATEGORIES_PER_BOARD,
};
use crate::services::provisioning::{BoardProvisioner, ProvisionError};

const MIN_SLUG_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum BoardServiceError {
    /// Input rejected before anything was written
    #[error("{0}")]
    Validation(String),

    #[error("Board not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A category as entered by the owner; color is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Body of a create-board request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBoardInput {
    pub name: String,
    /// Derived from the name when absent or blank
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryInput>,
}

/// Derive a URL slug from a board name
///
/// Lowercases, drops everything except ASCII letters, digits, whitespace and
/// hyphens, then joins the remaining words with `-`.
pub fn generate_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Check the board fields the provisioning flow expects to be valid
pub fn validate_new_board(
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<(), BoardServiceError> {
    let invalid = |msg: &str| -> Result<(), BoardServiceError> {
        Err(BoardServiceError::Validation(msg.to_string()))
    };

    if name.trim().is_empty() || slug.trim().is_empty() {
        return invalid("Name and slug are required");
    }
    if slug.chars().count() < MIN_SLUG_LENGTH {
        return invalid("Slug must be at least 3 characters long");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("Slug can only contain lowercase letters, numbers, and hyphens");
    }
    if name.trim().chars().count() > MAX_NAME_LENGTH {
        return invalid("Name must be 100 characters or less");
    }
    if description.map_or(0, |d| d.trim().chars().count()) > MAX_DESCRIPTION_LENGTH {
        return invalid("Description must be 500 characters or less");
    }
    Ok(())
}

/// Turn owner-entered categories into the batch sent to the store
///
/// An empty list becomes the single "General" category. Missing colors are
/// filled from the palette by position.
pub fn prepare_categories(inputs: &[CategoryInput]) -> Result<Vec<CategorySpec>, BoardServiceError> {
    if inputs.is_empty() {
        return Ok(vec![CategorySpec::general()]);
    }
    if inputs.len() > MAX_CATEGORIES_PER_BOARD {
        return Err(BoardServiceError::Validation(format!(
            "A board can have at most {} categories",
            MAX_CATEGORIES_PER_BOARD
        )));
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(BoardServiceError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(BoardServiceError::Validation(
                "Category name already exists".to_string(),
            ));
        }

        let color = match input.color.as_deref().map(str::trim) {
            Some(color) if !color.is_empty() => {
                if !is_valid_color(color) {
                    return Err(BoardServiceError::Validation(format!(
                        "Invalid category color: {}",
                        color
                    )));
                }
                color.to_string()
            }
            _ => CategorySpec::palette_color(index).to_string(),
        };
        specs.push(CategorySpec::new(name, color));
    }
    Ok(specs)
}

pub struct BoardService {
    boards: Arc<dyn BoardRepository>,
    categories: Arc<dyn CategoryRepository>,
    provisioner: Arc<BoardProvisioner>,
    cache: Arc<Cache>,
}

impl BoardService {
    pub fn new(
        boards: Arc<dyn BoardRepository>,
        categories: Arc<dyn CategoryRepository>,
        provisioner: Arc<BoardProvisioner>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            boards,
            categories,
            provisioner,
            cache,
        }
    }

    /// Validate the input and provision the board with its categories
    pub async fn create_board(
        &self,
        owner_id: &str,
        input: CreateBoardInput,
    ) -> Result<Board, BoardServiceError> {
        let name = input.name.trim().to_string();
        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => generate_slug(&name),
        };
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        validate_new_board(&name, &slug, description.as_deref())?;
        let categories = prepare_categories(&input.categories)?;

        let board = NewBoard {
            owner_id: owner_id.to_string(),
            name,
            slug,
            description,
        };
        Ok(self.provisioner.provision(board, categories).await?)
    }

    /// The owner's boards with feedback counts and categories, newest first
    pub async fn list_owned(&self, owner_id: &str) -> Result<Vec<BoardSummary>, BoardServiceError> {
        let boards = self
            .boards
            .list_by_owner(owner_id)
            .await
            .context("Failed to list boards")?;
        let categories = self
            .categories
            .list_by_owner(owner_id)
            .await
            .context("Failed to list categories")?;

        let mut by_board: HashMap<i64, Vec<_>> = HashMap::new();
        for category in categories {
            by_board.entry(category.board_id).or_default().push(category);
        }

        Ok(boards
            .into_iter()
            .map(|(board, feedback_count)| BoardSummary {
                categories: by_board.remove(&board.id).unwrap_or_default(),
                board,
                feedback_count,
            })
            .collect())
    }

    /// A board with its categories, visible only to its owner
    pub async fn get_owned(
        &self,
        owner_id: &str,
        slug: &str,
    ) -> Result<BoardWithCategories, BoardServiceError> {
        let board = self
            .boards
            .get_by_slug(slug)
            .await
            .context("Failed to get board")?
            .filter(|b| b.is_owned_by(owner_id))
            .ok_or_else(|| BoardServiceError::NotFound(slug.to_string()))?;

        let categories = self
            .categories
            .list_by_board(board.id)
            .await
            .context("Failed to list categories")?;
        Ok(BoardWithCategories { board, categories })
    }

    /// Owner check for writes addressed by board id
    pub async fn get_owned_by_id(
        &self,
        owner_id: &str,
        board_id: i64,
    ) -> Result<Board, BoardServiceError> {
        self.boards
            .get_by_id(board_id)
            .await
            .context("Failed to get board")?
            .filter(|b| b.is_owned_by(owner_id))
            .ok_or_else(|| BoardServiceError::NotFound(board_id.to_string()))
    }

    /// A board with its categories for the public submission page
    pub async fn get_public(&self, slug: &str) -> Result<BoardWithCategories, BoardServiceError> {
        let key = board_key(slug);
        match self.cache.get::<BoardWithCategories>(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e),
        }

        let board = self
            .boards
            .get_by_slug(slug)
            .await
            .context("Failed to get board")?
            .ok_or_else(|| BoardServiceError::NotFound(slug.to_string()))?;
        let categories = self
            .categories
            .list_by_board(board.id)
            .await
            .context("Failed to list categories")?;

        let result = BoardWithCategories { board, categories };
        // A board seen before its categories land is still being provisioned
        if result.categories.is_empty() {
            return Ok(result);
        }
        if let Err(e) = self.cache.set(&key, &result).await {
            tracing::warn!("Failed to cache board {}: {}", slug, e);
        }
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::fixtures::setup_pool;
    use crate::db::repositories::{SqlxBoardRepository, SqlxCategoryRepository};
    use crate::db::DynDatabasePool;
    use crate::store::SqlxProvisioningStore;
    use proptest::prelude::*;
    use std::time::Duration;

    pub(crate) fn board_service(pool: &DynDatabasePool) -> Arc<BoardService> {
        let cache = Arc::new(Cache::new(100, Duration::from_secs(60)));
        let provisioner = Arc::new(BoardProvisioner::new(
            SqlxProvisioningStore::boxed(pool.clone()),
            cache.clone(),
        ));
        Arc::new(BoardService::new(
            SqlxBoardRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            provisioner,
            cache,
        ))
    }

    fn input(name: &str, slug: Option<&str>) -> CreateBoardInput {
        CreateBoardInput {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            ..Default::default()
        }
    }

    fn validation_message(result: Result<(), BoardServiceError>) -> String {
        match result {
            Err(BoardServiceError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("My Product"), "my-product");
        assert_eq!(generate_slug("  Hello,   World! 2024 "), "hello-world-2024");
        assert_eq!(generate_slug("Café Feedback"), "caf-feedback");
        assert_eq!(generate_slug("already-a-slug"), "already-a-slug");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_validate_new_board() {
        assert!(validate_new_board("My Product", "my-product", None).is_ok());
        assert_eq!(
            validation_message(validate_new_board("", "my-product", None)),
            "Name and slug are required"
        );
        assert_eq!(
            validation_message(validate_new_board("Name", "  ", None)),
            "Name and slug are required"
        );
        assert_eq!(
            validation_message(validate_new_board("Name", "ab", None)),
            "Slug must be at least 3 characters long"
        );
        assert!(validate_new_board("Name", "Has Caps", None).is_err());
        assert!(validate_new_board(&"x".repeat(101), "abc", None).is_err());
        assert!(validate_new_board("Name", "abc", Some(&"d".repeat(501))).is_err());
        assert!(validate_new_board("Name", "abc", Some(&"d".repeat(500))).is_ok());
    }

    #[test]
    fn test_prepare_categories_defaults_to_general() {
        let specs = prepare_categories(&[]).unwrap();
        assert_eq!(specs, vec![CategorySpec::new("General", "#3B82F6")]);
    }

    #[test]
    fn test_prepare_categories_fills_palette_and_trims() {
        let specs = prepare_categories(&[
            CategoryInput::new(" Bugs "),
            CategoryInput::new("Ideas").with_color("#000000"),
            CategoryInput::new("Praise"),
        ])
        .unwrap();

        assert_eq!(
            specs,
            vec![
                CategorySpec::new("Bugs", "#3B82F6"),
                CategorySpec::new("Ideas", "#000000"),
                CategorySpec::new("Praise", "#EF4444"),
            ]
        );
    }

    #[test]
    fn test_prepare_categories_rejects_bad_input() {
        let duplicate = prepare_categories(&[CategoryInput::new("Bugs"), CategoryInput::new("bugs ")]);
        assert!(
            matches!(duplicate, Err(BoardServiceError::Validation(msg)) if msg == "Category name already exists")
        );

        assert!(prepare_categories(&[CategoryInput::new("   ")]).is_err());
        assert!(prepare_categories(&[CategoryInput::new("A").with_color("red")]).is_err());

        let too_many: Vec<_> = (0..9).map(|i| CategoryInput::new(format!("C{}", i))).collect();
        assert!(prepare_categories(&too_many).is_err());
    }

    #[tokio::test]
    async fn test_create_board_with_default_category() {
        let pool = setup_pool().await;
        let service = board_service(&pool);

        let board = service
            .create_board("owner-1", input("My Product", Some("my-product")))
            .await
            .unwrap();
        assert_eq!(board.slug, "my-product");

        let owned = service.get_owned("owner-1", "my-product").await.unwrap();
        assert_eq!(owned.categories.len(), 1);
        assert_eq!(owned.categories[0].name, "General");
    }

    #[tokio::test]
    async fn test_create_board_derives_slug_from_name() {
        let pool = setup_pool().await;
        let service = board_service(&pool);

        let board = service
            .create_board("owner-1", input("Acme Roadmap", None))
            .await
            .unwrap();
        assert_eq!(board.slug, "acme-roadmap");
    }

    #[tokio::test]
    async fn test_create_board_validation_writes_nothing() {
        let pool = setup_pool().await;
        let service = board_service(&pool);

        let err = service
            .create_board("owner-1", input("Name", Some("ab")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Slug must be at least 3 characters long");
        assert!(service.list_owned("owner-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_taken_slug_is_conflict() {
        let pool = setup_pool().await;
        let service = board_service(&pool);
        service
            .create_board("owner-1", input("First", Some("shared")))
            .await
            .unwrap();

        let err = service
            .create_board("owner-2", input("Second", Some("shared")))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardServiceError::Provision(ref e) if e.is_slug_conflict()));
    }

    #[tokio::test]
    async fn test_get_owned_hides_other_owners_boards() {
        let pool = setup_pool().await;
        let service = board_service(&pool);
        service
            .create_board("owner-1", input("Mine", Some("mine")))
            .await
            .unwrap();

        assert!(matches!(
            service.get_owned("owner-2", "mine").await,
            Err(BoardServiceError::NotFound(_))
        ));
        assert!(service.get_public("mine").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_owned_groups_categories() {
        let pool = setup_pool().await;
        let service = board_service(&pool);
        let mut with_categories = input("Two", Some("two"));
        with_categories.categories = vec![CategoryInput::new("Bugs"), CategoryInput::new("Ideas")];
        service.create_board("owner-1", input("One", Some("one"))).await.unwrap();
        service.create_board("owner-1", with_categories).await.unwrap();

        let summaries = service.list_owned("owner-1").await.unwrap();
        assert_eq!(summaries.len(), 2);
        let two = summaries.iter().find(|s| s.board.slug == "two").unwrap();
        assert_eq!(two.categories.len(), 2);
        assert_eq!(two.feedback_count, 0);
    }

    #[tokio::test]
    async fn test_get_public_reads_through_cache() {
        let pool = setup_pool().await;
        let service = board_service(&pool);
        service
            .create_board("owner-1", input("Cached", Some("cached")))
            .await
            .unwrap();

        let first = service.get_public("cached").await.unwrap();
        let cached: Option<BoardWithCategories> =
            service.cache.get(&board_key("cached")).await.unwrap();
        assert_eq!(cached.unwrap().board.id, first.board.id);

        assert!(matches!(
            service.get_public("missing").await,
            Err(BoardServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_public_during_provisioning_is_not_cached() {
        use crate::store::ProvisioningStore;

        let pool = setup_pool().await;
        let service = board_service(&pool);
        let store = SqlxProvisioningStore::new(pool.clone());

        let board = store
            .insert_board(&NewBoard {
                owner_id: "owner-1".to_string(),
                name: "My Product".to_string(),
                slug: "my-product".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .unwrap();

        let early = service.get_public("my-product").await.unwrap();
        assert!(early.categories.is_empty());
        let cached: Option<BoardWithCategories> =
            service.cache.get(&board_key("my-product")).await.unwrap();
        assert!(cached.is_none());

        store
            .insert_categories(board.id, &[CategorySpec::general()])
            .await
            .unwrap();

        let later = service.get_public("my-product").await.unwrap();
        assert_eq!(later.categories.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_provisioning_clears_stale_cache_entry() {
        let pool = setup_pool().await;
        let service = board_service(&pool);

        let stale = BoardWithCategories {
            board: Board {
                id: 999,
                owner_id: "owner-1".to_string(),
                slug: "fresh".to_string(),
                name: "Fresh".to_string(),
                description: None,
                created_at: chrono::Utc::now(),
            },
            categories: vec![],
        };
        service.cache.set(&board_key("fresh"), &stale).await.unwrap();

        service
            .create_board("owner-1", input("Fresh", Some("fresh")))
            .await
            .unwrap();

        let public = service.get_public("fresh").await.unwrap();
        assert_eq!(public.categories.len(), 1);
        assert_ne!(public.board.id, 999);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn generated_slugs_use_slug_charset(name in "\\PC{0,60}") {
            let slug = generate_slug(&name);
            prop_assert!(slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn slugs_from_word_names_validate(words in proptest::collection::vec("[a-zA-Z0-9]{3,8}", 1..5)) {
            let name = words.join(" ");
            let slug = generate_slug(&name);
            prop_assert!(validate_new_board(&name, &slug, None).is_ok());
            prop_assert_eq!(slug.matches('-').count(), words.len() - 1);
        }

        #[test]
        fn prepared_categories_are_unique_and_colored(
            names in proptest::collection::hash_set("[a-z]{1,10}", 1..=8)
        ) {
            let inputs: Vec<CategoryInput> = names.iter().map(|n| CategoryInput::new(n.as_str())).collect();
            let specs = prepare_categories(&inputs).unwrap();
            prop_assert_eq!(specs.len(), inputs.len());
            for (i, spec) in specs.iter().enumerate() {
                prop_assert_eq!(spec.color.as_str(), CategorySpec::palette_color(i));
            }
        }
    }
}
