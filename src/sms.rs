//! Text messages and phone verification through Twilio.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::Sms;
use crate::error::ProviderError;

pub const DEFAULT_API_URL: &str = "https://api.twilio.com/";
pub const DEFAULT_VERIFY_URL: &str = "https://verify.twilio.com/";
const REQUEST_TIMEOUT_SECS: u64 = 20;
const APPROVED: &str = "approved";

#[derive(Debug, Deserialize)]
struct VerificationStatus {
    status: String,
}

#[derive(Debug)]
struct Account {
    client: Client,
    messages_url: String,
    verify_url: Option<String>,
    sid: String,
    token: String,
    from: String,
}

/// Twilio instance manager.
///
/// Without configuration every message is skipped and verification is
/// unavailable.
#[derive(Debug, Clone, Default)]
pub struct SmsManager {
    account: Option<Arc<Account>>,
}

impl SmsManager {
    /// Create a new [`SmsManager`].
    pub fn new(config: &Sms) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_url.trim_end_matches('/'),
            config.account_sid
        );
        let verify_url = config.verify_service_sid.as_ref().map(|service| {
            format!(
                "{}/v2/Services/{service}",
                config.verify_url.trim_end_matches('/')
            )
        });

        if config.from.is_empty() {
            tracing::warn!("twilio sender phone is missing");
        }

        Ok(Self {
            account: Some(Arc::new(Account {
                client,
                messages_url,
                verify_url,
                sid: config.account_sid.clone(),
                token: config.auth_token.clone(),
                from: config.from.clone(),
            })),
        })
    }

    /// Whether a provider is configured.
    pub fn is_enabled(&self) -> bool {
        self.account.is_some()
    }

    /// Whether one-time codes can be sent.
    pub fn can_verify(&self) -> bool {
        self.account
            .as_ref()
            .is_some_and(|account| account.verify_url.is_some())
    }

    async fn post(
        account: &Account,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, ProviderError> {
        let response = account
            .client
            .post(url)
            .basic_auth(&account.sid, Some(&account.token))
            .form(form)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ProviderError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Send a text message. Returns `false` when no provider is configured.
    pub async fn send_message(
        &self,
        to: &str,
        body: &str,
    ) -> Result<bool, ProviderError> {
        let Some(account) = &self.account else {
            tracing::debug!("twilio credentials missing; skipping sms");
            return Ok(false);
        };

        Self::post(
            account,
            &account.messages_url,
            &[("To", to), ("From", account.from.as_str()), ("Body", body)],
        )
        .await?;

        tracing::trace!("sms sent");
        Ok(true)
    }

    /// Send a one-time code to `to`.
    ///
    /// Returns `false` when verification is not configured.
    pub async fn start_verification(&self, to: &str) -> Result<bool, ProviderError> {
        let Some((account, url)) = self.verify() else {
            return Ok(false);
        };

        Self::post(
            account,
            &format!("{url}/Verifications"),
            &[("To", to), ("Channel", "sms")],
        )
        .await?;

        Ok(true)
    }

    /// Check a one-time code previously sent to `to`.
    pub async fn check_verification(
        &self,
        to: &str,
        code: &str,
    ) -> Result<bool, ProviderError> {
        let Some((account, url)) = self.verify() else {
            return Ok(false);
        };

        let response = Self::post(
            account,
            &format!("{url}/VerificationCheck"),
            &[("To", to), ("Code", code)],
        )
        .await?;
        let status: VerificationStatus = response.json().await?;

        Ok(status.status == APPROVED)
    }

    fn verify(&self) -> Option<(&Account, &str)> {
        let account = self.account.as_deref()?;
        let url = account.verify_url.as_deref()?;
        Some((account, url))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn manager(server: &MockServer) -> SmsManager {
        SmsManager::new(&Sms {
            api_url: server.uri(),
            verify_url: server.uri(),
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from: "+15550100".into(),
            verify_service_sid: Some("VA456".into()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("From=%2B15550100"))
            .and(body_string_contains("To=%2B919800000000"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM1" })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(manager(&server)
            .send_message("+919800000000", "Stay hydrated")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_verification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/Services/VA456/Verifications"))
            .and(body_string_contains("Channel=sms"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "pending" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/Services/VA456/VerificationCheck"))
            .and(body_string_contains("Code=123456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "approved" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/Services/VA456/VerificationCheck"))
            .and(body_string_contains("Code=000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "pending" })))
            .mount(&server)
            .await;

        let sms = manager(&server);
        assert!(sms.can_verify());
        assert!(sms.start_verification("+919800000000").await.unwrap());
        assert!(sms.check_verification("+919800000000", "123456").await.unwrap());
        assert!(!sms.check_verification("+919800000000", "000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid number"))
            .mount(&server)
            .await;

        let err = manager(&server).send_message("123", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_disabled() {
        let sms = SmsManager::default();
        assert!(!sms.is_enabled());
        assert!(!sms.can_verify());
        assert!(!sms.send_message("+1", "hi").await.unwrap());
        assert!(!sms.start_verification("+1").await.unwrap());
    }
}
