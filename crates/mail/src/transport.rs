use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("mail relay request failed: {0}")]
    Send(String),
    #[error("mail relay rejected the message with status {0}")]
    BadStatus(u16),
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Delivers through an HTTP mail relay (Mailgun-style JSON API).
pub struct HttpRelayTransport {
    client: reqwest::Client,
    api_url: String,
    api_token: SecretString,
    from_address: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpRelayTransport {
    pub fn new(api_url: String, api_token: SecretString, from_address: String) -> Self {
        Self { client: reqwest::Client::new(), api_url, api_token, from_address }
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), TransportError> {
        let payload = RelayPayload {
            from: &self.from_address,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| TransportError::Send(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::BadStatus(response.status().as_u16()));
        }

        info!(
            event_name = "mail.delivered",
            to = %message.to,
            subject = %message.subject,
            "delivered mail via relay"
        );
        Ok(())
    }
}

/// Drops messages on the floor. Used when mail is disabled in config.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl MailTransport for NoopTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), TransportError> {
        info!(
            event_name = "mail.skipped",
            to = %message.to,
            subject = %message.subject,
            "mail disabled; dropping message"
        );
        Ok(())
    }
}
