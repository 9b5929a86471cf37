//! New-feedback notifications
//!
//! Owners opt in per board through `BoardSettings`. Delivery happens off the
//! request path and failures only reach the log.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::SmtpConfig;
use crate::db::repositories::BoardSettingsRepository;
use crate::models::{Board, BoardSettings, Feedback};

/// Outgoing plain-text mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Mailer backed by an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// Sender mailbox from the smtp section; a bad `from` fails at startup
fn sender_mailbox(config: &SmtpConfig) -> Result<Mailbox> {
    let address: Address = config
        .from
        .trim()
        .parse()
        .with_context(|| format!("Invalid smtp.from address '{}'", config.from))?;
    let name = Some(config.from_name.clone()).filter(|n| !n.trim().is_empty());
    Ok(Mailbox::new(name, address))
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let from = sender_mailbox(config)?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

pub struct NotificationService {
    settings_repo: Arc<dyn BoardSettingsRepository>,
    mailer: Option<Arc<dyn Mailer>>,
    public_base_url: String,
}

impl NotificationService {
    /// `mailer` is `None` when SMTP is not configured
    pub fn new(
        settings_repo: Arc<dyn BoardSettingsRepository>,
        mailer: Option<Arc<dyn Mailer>>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            settings_repo,
            mailer,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Mail the board owner about a new submission, if they asked for it
    ///
    /// Returns whether a message was sent.
    pub async fn notify_new_feedback(&self, board: &Board, feedback: &Feedback) -> Result<bool> {
        let Some(mailer) = &self.mailer else {
            return Ok(false);
        };

        let settings = self
            .settings_repo
            .get(board.id)
            .await
            .context("Failed to load board settings")?
            .unwrap_or_else(|| BoardSettings::defaults_for(board.id));
        let Some(to) = settings.notify_address() else {
            return Ok(false);
        };

        let subject = format!("[{}] New feedback received", board.name);
        mailer.send(to, &subject, &self.message_body(board, feedback)).await?;
        tracing::debug!("Sent new-feedback notification for board {}", board.slug);
        Ok(true)
    }

    /// Fire-and-forget variant used by the submission path
    pub fn spawn_new_feedback(self: &Arc<Self>, board: Board, feedback: Feedback) {
        if !self.is_enabled() {
            return;
        }
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.notify_new_feedback(&board, &feedback).await {
                tracing::warn!(
                    "Failed to send notification for board {}: {:#}",
                    board.slug,
                    e
                );
            }
        });
    }

    fn message_body(&self, board: &Board, feedback: &Feedback) -> String {
        let author = feedback
            .author_name
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or("Anonymous");
        format!(
            "New feedback on {}:\n\n{}\n\nFrom: {}\n\nView the board: {}{}\n",
            board.name,
            feedback.description,
            author,
            self.public_base_url,
            board.public_path()
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{seed_board, seed_feedback, setup_pool};
    use crate::db::repositories::SqlxBoardSettingsRepository;
    use std::sync::Mutex;

    /// Records every message instead of delivering it
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn smtp_config(from: &str) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: from.to_string(),
            from_name: "Feedboard".to_string(),
        }
    }

    #[test]
    fn test_sender_mailbox_includes_display_name() {
        let mailbox = sender_mailbox(&smtp_config("bot@example.com")).unwrap();
        assert_eq!(mailbox.email.to_string(), "bot@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("Feedboard"));
    }

    #[tokio::test]
    async fn test_smtp_mailer_rejects_missing_from_address() {
        assert!(SmtpMailer::from_config(&smtp_config("")).is_err());
        assert!(SmtpMailer::from_config(&smtp_config("not-an-address")).is_err());
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_sends_to_configured_address() {
        let pool = setup_pool().await;
        let (board, categories) = seed_board(&pool, "owner-1", "acme", &["General"]).await;
        let feedback = seed_feedback(&pool, board.id, categories[0].id, "Love the new editor", None).await;

        let settings_repo = SqlxBoardSettingsRepository::boxed(pool.clone());
        let mut settings = BoardSettings::defaults_for(board.id);
        settings.notification_email = Some("owner@example.com".to_string());
        settings_repo.upsert(&settings).await.unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let service = NotificationService::new(settings_repo, Some(mailer.clone()), "https://fb.example/");

        assert!(service.notify_new_feedback(&board, &feedback).await.unwrap());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "owner@example.com");
        assert_eq!(sent[0].1, "[acme] New feedback received");
        assert!(sent[0].2.contains("Love the new editor"));
        assert!(sent[0].2.contains("From: Anonymous"));
        assert!(sent[0].2.contains("https://fb.example/boards/acme"));
    }

    #[tokio::test]
    async fn test_skips_without_address_or_when_disabled() {
        let pool = setup_pool().await;
        let (board, categories) = seed_board(&pool, "owner-1", "quiet", &["General"]).await;
        let feedback = seed_feedback(&pool, board.id, categories[0].id, "Quiet please thanks", None).await;
        let settings_repo = SqlxBoardSettingsRepository::boxed(pool.clone());
        let mailer = Arc::new(RecordingMailer::default());
        let service = NotificationService::new(settings_repo.clone(), Some(mailer.clone()), "");

        assert!(!service.notify_new_feedback(&board, &feedback).await.unwrap());

        let mut settings = BoardSettings::defaults_for(board.id);
        settings.email_notifications = false;
        settings.notification_email = Some("owner@example.com".to_string());
        settings_repo.upsert(&settings).await.unwrap();

        assert!(!service.notify_new_feedback(&board, &feedback).await.unwrap());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_without_mailer() {
        let pool = setup_pool().await;
        let (board, categories) = seed_board(&pool, "owner-1", "nomail", &["General"]).await;
        let feedback = seed_feedback(&pool, board.id, categories[0].id, "Nobody will read this", None).await;
        let service = NotificationService::new(SqlxBoardSettingsRepository::boxed(pool), None, "");

        assert!(!service.is_enabled());
        assert!(!service.notify_new_feedback(&board, &feedback).await.unwrap());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_an_error() {
        let pool = setup_pool().await;
        let (board, categories) = seed_board(&pool, "owner-1", "broken", &["General"]).await;
        let feedback = seed_feedback(&pool, board.id, categories[0].id, "This will bounce back", None).await;
        let settings_repo = SqlxBoardSettingsRepository::boxed(pool.clone());
        let mut settings = BoardSettings::defaults_for(board.id);
        settings.notification_email = Some("owner@example.com".to_string());
        settings_repo.upsert(&settings).await.unwrap();

        let service = NotificationService::new(settings_repo, Some(Arc::new(FailingMailer)), "");
        assert!(service.notify_new_feedback(&board, &feedback).await.is_err());
    }

    #[test]
    fn test_smtp_mailer_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from: "noreply@example.com".to_string(),
            from_name: "Feedboard".to_string(),
        };
        let mailer = SmtpMailer::from_config(&config).unwrap();
        assert_eq!(mailer.from.to_string(), "Feedboard <noreply@example.com>");
    }
}
