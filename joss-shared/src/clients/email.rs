use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{ClientError, Notifier};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Sends account e-mails through the Resend HTTP API.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        })
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), ClientError> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("email send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected(format!("email API error {status}: {body}")));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailClient {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), ClientError> {
        self.send_email(to, "Verify your Joss AI account", &verification_html(link))
            .await
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ClientError> {
        self.send_email(to, "Reset your Joss AI password", &password_reset_html(link))
            .await
    }
}

fn verification_html(link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
        <h2 style="color: #B25CD9; text-align: center;">Welcome to Joss AI</h2>
        <p>Please confirm your email address to activate your account:</p>
        <div style="text-align: center; margin: 30px 0;">
          <a href="{link}" style="background-color: #B25CD9; color: white; padding: 12px 20px; text-decoration: none; border-radius: 4px; font-weight: bold;">Verify Email</a>
        </div>
        <p>Or copy and paste this link in your browser:</p>
        <p style="word-break: break-all; color: #4F46E5;">{link}</p>
        <p>This link will expire in 24 hours.</p>
        </div>"#
    )
}

fn password_reset_html(link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
        <h2 style="color: #B25CD9; text-align: center;">Joss AI Password Reset</h2>
        <p>We received a request to reset your password. If you didn't make this request, you can safely ignore this email.</p>
        <div style="text-align: center; margin: 30px 0;">
          <a href="{link}" style="background-color: #B25CD9; color: white; padding: 12px 20px; text-decoration: none; border-radius: 4px; font-weight: bold;">Reset Password</a>
        </div>
        <p>Or copy and paste this link in your browser:</p>
        <p style="word-break: break-all; color: #4F46E5;">{link}</p>
        <p>This link will expire in 1 hour for security reasons.</p>
        </div>"#
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub kind: EmailKind,
    pub to: String,
    pub link: String,
}

/// Keeps e-mails in memory and logs them instead of delivering.
/// Used for local development and by the test-suite to read issued links.
#[derive(Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recent link sent to `to` for the given kind.
    pub fn last_link(&self, kind: EmailKind, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.kind == kind && m.to == to)
            .map(|m| m.link)
    }

    fn record(&self, kind: EmailKind, to: &str, link: &str) {
        tracing::info!(?kind, to = %to, link = %link, "outbox email");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(OutboundEmail {
                kind,
                to: to.to_string(),
                link: link.to_string(),
            });
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), ClientError> {
        self.record(EmailKind::Verification, to, link);
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ClientError> {
        self.record(EmailKind::PasswordReset, to, link);
        Ok(())
    }
}
