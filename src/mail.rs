//! Send emails to user through SendGrid.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::config::Mail;
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/";
const SEND_PATH: &str = "v3/mail/send";
const REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Serialize)]
struct Payload<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    content: [Content<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
    subject: &'a str,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    r#type: &'static str,
    value: &'a str,
}

#[derive(Debug)]
struct Sender {
    client: Client,
    url: String,
    api_key: String,
    email: String,
    name: String,
}

/// SendGrid instance manager.
///
/// Without configuration every send is skipped.
#[derive(Debug, Clone, Default)]
pub struct MailManager {
    sender: Option<Arc<Sender>>,
}

impl MailManager {
    /// Create a new [`MailManager`].
    pub fn new(config: &Mail) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        tracing::info!(sender = %config.sender_email, "sendgrid mailer ready");

        Ok(Self {
            sender: Some(Arc::new(Sender {
                client,
                url: format!("{}/{SEND_PATH}", config.base_url.trim_end_matches('/')),
                api_key: config.api_key.clone(),
                email: config.sender_email.clone(),
                name: config.sender_name.clone(),
            })),
        })
    }

    /// Whether a provider is configured.
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Send a plain-text email, with an HTML copy.
    ///
    /// Returns `false` when no provider is configured.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<bool, ProviderError> {
        let Some(sender) = &self.sender else {
            tracing::debug!(%subject, "sendgrid api key missing; skipping email");
            return Ok(false);
        };

        let html = body.replace('\n', "<br>");
        let payload = Payload {
            personalizations: [Personalization {
                to: [Address {
                    email: to,
                    name: None,
                }],
                subject,
            }],
            from: Address {
                email: &sender.email,
                name: Some(&sender.name),
            },
            content: [
                Content {
                    r#type: "text/plain",
                    value: body,
                },
                Content {
                    r#type: "text/html",
                    value: &html,
                },
            ],
        };

        let response = sender
            .client
            .post(&sender.url)
            .bearer_auth(&sender.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::trace!(%subject, "email sent");
            Ok(true)
        } else {
            Err(ProviderError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
