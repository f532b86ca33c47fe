//! Mailbox existence checks through Abstract API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::EmailValidation;
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://emailvalidation.abstractapi.com/";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Default, Deserialize)]
struct Flag {
    #[serde(default)]
    value: bool,
}

#[derive(Debug, Deserialize)]
struct Validation {
    #[serde(default)]
    is_valid_format: Flag,
    #[serde(default)]
    is_smtp_valid: Flag,
    #[serde(default)]
    is_disposable_email: Flag,
}

impl Validation {
    fn is_real(&self) -> bool {
        self.is_valid_format.value
            && self.is_smtp_valid.value
            && !self.is_disposable_email.value
    }
}

#[derive(Debug)]
struct Inner {
    client: Client,
    url: String,
    api_key: String,
}

/// Checks that an address has a reachable, non-disposable mailbox.
///
/// Without configuration every address is accepted.
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    inner: Option<Arc<Inner>>,
}

impl EmailValidator {
    /// Create a new [`EmailValidator`].
    pub fn new(config: &EmailValidation) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            inner: Some(Arc::new(Inner {
                client,
                url: format!("{}/v1/", config.base_url.trim_end_matches('/')),
                api_key: config.api_key.clone(),
            })),
        })
    }

    /// Whether `email` looks like a real mailbox.
    ///
    /// Provider failures count as "not real".
    pub async fn is_real_email(&self, email: &str) -> bool {
        let Some(inner) = &self.inner else {
            return true;
        };

        match Self::validate(inner, email).await {
            Ok(validation) => validation.is_real(),
            Err(err) => {
                tracing::warn!(error = %err, "email validation failed");
                false
            },
        }
    }

    async fn validate(inner: &Inner, email: &str) -> Result<Validation, ProviderError> {
        let response = inner
            .client
            .get(&inner.url)
            .query(&[("api_key", inner.api_key.as_str()), ("email", email)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}
