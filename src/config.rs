//! Configuration manager for healthcast.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const CONFIG_PATH_ENV: &str = "HEALTHCAST_CONFIG";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    /// Support contacts shown on the status page.
    pub support: Option<Support>,
    /// Short presentation of the service.
    pub about: Option<String>,
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to SQLite configuration.
    #[serde(skip_serializing)]
    pub database: Database,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Related to the weather provider.
    #[serde(skip_serializing)]
    pub weather: Weather,
    /// Related to automatic mail sending.
    #[serde(skip_serializing)]
    pub mail: Option<Mail>,
    /// Related to SMS and phone verification.
    #[serde(skip_serializing)]
    pub sms: Option<Sms>,
    /// Related to mailbox existence checks on signup.
    #[serde(skip_serializing)]
    pub email_validation: Option<EmailValidation>,
    /// Related to the periodic alert job.
    #[serde(skip_serializing)]
    pub alerts: Alerts,
    /// Related to OTLP export.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "HealthCare Advisor".into(),
            url: "http://localhost:8080/".into(),
            support: None,
            about: None,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            database: Database::default(),
            argon2: None,
            weather: Weather::default(),
            mail: None,
            sms: None,
            email_validation: None,
            alerts: Alerts::default(),
            telemetry: None,
        }
    }
}

/// Public contact information.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

/// SQLite configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// Connection string, e.g. `sqlite://database.db`.
    pub url: String,
    /// Maximum pool connections.
    pub pool_size: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: crate::database::DEFAULT_DATABASE_URL.into(),
            pool_size: crate::database::DEFAULT_POOL_SIZE,
        }
    }
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// OpenWeatherMap configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub base_url: String,
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            base_url: crate::weather::DEFAULT_BASE_URL.into(),
            api_key: String::default(),
            timeout: 10,
        }
    }
}

/// SendGrid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    #[serde(default = "default_sendgrid_url")]
    pub base_url: String,
    pub api_key: String,
    /// Sender address, e.g. `no-reply@example.com`.
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

fn default_sendgrid_url() -> String {
    crate::mail::DEFAULT_BASE_URL.into()
}

fn default_sender_name() -> String {
    "Health Advisor".into()
}

/// Twilio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sms {
    #[serde(default = "default_twilio_api_url")]
    pub api_url: String,
    #[serde(default = "default_twilio_verify_url")]
    pub verify_url: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Sender phone number.
    pub from: String,
    /// Twilio Verify service used for OTP codes.
    pub verify_service_sid: Option<String>,
}

fn default_twilio_api_url() -> String {
    crate::sms::DEFAULT_API_URL.into()
}

fn default_twilio_verify_url() -> String {
    crate::sms::DEFAULT_VERIFY_URL.into()
}

/// Abstract API email validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailValidation {
    #[serde(default = "default_email_validation_url")]
    pub base_url: String,
    pub api_key: String,
}

fn default_email_validation_url() -> String {
    crate::email_validation::DEFAULT_BASE_URL.into()
}

/// Periodic alert job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alerts {
    /// Pause after each provider call, in milliseconds.
    pub delay_ms: u64,
}

impl Default for Alerts {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

/// OTLP exporter configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub otlp_endpoint: String,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path, the
    /// `HEALTHCAST_CONFIG` environment variable or the default location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            PathBuf::from(path)
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file)
            {
                Ok(config) => config,
                Err(err) => self.error(err, "`config.yaml` file is malformed"),
            },
            Err(err) => self.error(err, "`config.yaml` file not found"),
        };

        let mut config = config.with_env();

        // set app version.
        config.version = VERSION.to_owned();

        // normalize URLs.
        config.url = self.normalize_url(&config.url)?;
        config.weather.base_url = self.normalize_url(&config.weather.base_url)?;
        if let Some(mail) = config.mail.as_mut() {
            mail.base_url = self.normalize_url(&mail.base_url)?;
        }
        if let Some(sms) = config.sms.as_mut() {
            sms.api_url = self.normalize_url(&sms.api_url)?;
            sms.verify_url = self.normalize_url(&sms.verify_url)?;
        }
        if let Some(validation) = config.email_validation.as_mut() {
            validation.base_url = self.normalize_url(&validation.base_url)?;
        }

        Ok(Arc::new(config))
    }

    /// Override secrets with environment variables.
    pub fn with_env(mut self) -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(url) = env("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(key) = env("WEATHER_API_KEY") {
            self.weather.api_key = key;
        }

        if let Some(key) = env("SENDGRID_API_KEY") {
            let sender = env("SENDER_EMAIL");
            match self.mail.as_mut() {
                Some(mail) => {
                    mail.api_key = key;
                    if let Some(sender) = sender {
                        mail.sender_email = sender;
                    }
                },
                None => {
                    self.mail = Some(Mail {
                        base_url: default_sendgrid_url(),
                        api_key: key,
                        sender_email: sender
                            .unwrap_or_else(|| "noreply@healthcast.app".into()),
                        sender_name: default_sender_name(),
                    })
                },
            }
        }

        if let (Some(sid), Some(token)) = (env("TWILIO_SID"), env("TWILIO_AUTH"))
        {
            let from = env("TWILIO_PHONE");
            let verify = env("TWILIO_VERIFY_SID");
            match self.sms.as_mut() {
                Some(sms) => {
                    sms.account_sid = sid;
                    sms.auth_token = token;
                    if let Some(from) = from {
                        sms.from = from;
                    }
                    if verify.is_some() {
                        sms.verify_service_sid = verify;
                    }
                },
                None => {
                    self.sms = Some(Sms {
                        api_url: default_twilio_api_url(),
                        verify_url: default_twilio_verify_url(),
                        account_sid: sid,
                        auth_token: token,
                        from: from.unwrap_or_default(),
                        verify_service_sid: verify,
                    })
                },
            }
        }

        if let Some(key) = env("EMAIL_VALIDATION_KEY") {
            match self.email_validation.as_mut() {
                Some(validation) => validation.api_key = key,
                None => {
                    self.email_validation = Some(EmailValidation {
                        base_url: default_email_validation_url(),
                        api_key: key,
                    })
                },
            }
        }

        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error, reason: &str) -> Self {
        tracing::error!(error = %err, "{reason}, using defaults");
        Self::default()
    }
}
