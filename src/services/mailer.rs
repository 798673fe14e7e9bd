//! Outgoing account emails (verification and password reset links).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{EmailConfig, EmailProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// The actionable link embedded in `body`.
    pub link: String,
}

impl OutgoingEmail {
    /// The link with its query string masked, safe for shipped logs.
    #[must_use]
    pub fn redacted_link(&self) -> String {
        match self.link.split_once('?') {
            Some((base, _)) => format!("{base}?token=<redacted>"),
            None => self.link.clone(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

#[must_use]
pub fn from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match config.provider {
        EmailProvider::Log => Arc::new(LogMailer),
        EmailProvider::Http => match HttpMailer::new(config.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build HTTP mailer, falling back to log");
                Arc::new(LogMailer)
            }
        },
    }
}

/// Builds `{frontend_url}/{path}?token=<raw>`.
pub fn action_link(frontend_url: &str, path: &str, raw_token: &str) -> Result<String> {
    let base = frontend_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{path}"))
        .with_context(|| format!("Invalid frontend URL: {frontend_url}"))?;
    url.query_pairs_mut().append_pair("token", raw_token);
    Ok(url.into())
}

#[must_use]
pub fn verification_email(to: &str, username: &str, link: String) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your Mexicapp account".to_string(),
        body: format!(
            "Hi {username},\n\nConfirm your email address by opening the link below:\n\n{link}\n\nThe link expires in 24 hours."
        ),
        link,
    }
}

#[must_use]
pub fn password_reset_email(to: &str, username: &str, link: String) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your Mexicapp password".to_string(),
        body: format!(
            "Hi {username},\n\nSomeone asked to reset your password. If it was you, open the link below:\n\n{link}\n\nThe link expires in 1 hour. If you did not ask for this, ignore this email."
        ),
        link,
    }
}

/// Writes mail to the log. Development default.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            link = %email.redacted_link(),
            "Email (log provider)"
        );
        debug!(to = %email.to, link = %email.link, "Email link (log provider)");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    text_content: String,
}

/// Posts mail to a transactional email HTTP API.
pub struct HttpMailer {
    client: Client,
    config: EmailConfig,
}

impl HttpMailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("Mexicapp/1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.config.from_address.clone(),
                name: Some(self.config.from_name.clone()).filter(|n| !n.is_empty()),
            },
            to: vec![EmailAddress {
                email: email.to.clone(),
                name: None,
            }],
            subject: email.subject,
            text_content: email.body,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Email provider request failed")?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %email.to, "Email accepted by provider");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("Email provider rejected message (status={status}): {text}")
    }
}

/// Keeps sent mail in memory so tests can read the links.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Token query parameter of the most recent mail sent to `to`.
    #[must_use]
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent();
        let email = sent.iter().rev().find(|e| e.to == to)?;
        let url = Url::parse(&email.link).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Mailbox lock poisoned"))?
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_link() {
        let link = action_link("http://localhost:5173/", "verify-email", "abc123").unwrap();
        assert_eq!(link, "http://localhost:5173/verify-email?token=abc123");

        let link = action_link("https://app.example.com", "password-reset/confirm", "f00").unwrap();
        assert_eq!(link, "https://app.example.com/password-reset/confirm?token=f00");
    }

    #[test]
    fn test_redacted_link_hides_token() {
        let link = action_link("http://localhost", "password-reset/confirm", "cafe01").unwrap();
        let email = password_reset_email("a@example.com", "alice", link);

        let redacted = email.redacted_link();
        assert_eq!(redacted, "http://localhost/password-reset/confirm?token=<redacted>");
        assert!(!redacted.contains("cafe01"));
    }

    #[test]
    fn test_action_link_rejects_garbage() {
        assert!(action_link("not a url", "verify-email", "x").is_err());
    }

    #[tokio::test]
    async fn test_memory_mailer_extracts_token() {
        let mailer = MemoryMailer::new();
        let link = action_link("http://localhost", "verify-email", "deadbeef").unwrap();
        mailer
            .send(verification_email("a@example.com", "alice", link))
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(
            mailer.last_token_for("a@example.com").as_deref(),
            Some("deadbeef")
        );
        assert!(mailer.last_token_for("b@example.com").is_none());
    }
}
