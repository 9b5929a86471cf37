//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They
//! validate input, enforce board ownership and coordinate the cache.
//! Board creation goes through the provisioning flow in [`provisioning`].

pub mod analytics;
pub mod board;
pub mod dashboard;
pub mod export;
pub mod feedback;
pub mod notification;
pub mod provisioning;
pub mod rate_limiter;
pub mod reaction;
pub mod settings;

pub use analytics::BoardAnalytics;
pub use board::{
    generate_slug, BoardService, BoardServiceError, CategoryInput, CreateBoardInput,
};
pub use dashboard::{DashboardOverview, DashboardService};
pub use export::CsvExport;
pub use feedback::{
    FeedbackFilter, FeedbackService, FeedbackServiceError, FeedbackSort, SubmitFeedbackInput,
};
pub use notification::{Mailer, NotificationService, SmtpMailer};
pub use provisioning::{BoardProvisioner, ProvisionError, ProvisionOutcome};
pub use rate_limiter::SubmissionRateLimiter;
pub use reaction::{ReactionService, ReactionServiceError};
pub use settings::{SettingsService, SettingsServiceError, UpdateSettingsInput};
