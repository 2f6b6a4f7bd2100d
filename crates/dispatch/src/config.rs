use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Credentials and endpoint for the WhatsApp Business Cloud API.
#[derive(Clone, Debug, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub access_token: String,
    pub phone_number_id: String,
    pub business_account_id: Option<String>,
    /// Per-call timeout in seconds for a single provider request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl WhatsAppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Batch sizing and pacing used to stay below the provider's implicit
/// rate limit. Not a generic concurrency pool.
#[derive(Clone, Debug, Deserialize)]
pub struct PacingConfig {
    /// Recipient pipelines run concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between the text and location parts of one pipeline.
    #[serde(default = "default_inter_message_pause_ms")]
    pub inter_message_pause_ms: u64,
    /// Barrier pause between consecutive batches.
    #[serde(default = "default_inter_batch_pause_ms")]
    pub inter_batch_pause_ms: u64,
}

impl PacingConfig {
    pub fn inter_message_pause(&self) -> Duration {
        Duration::from_millis(self.inter_message_pause_ms)
    }

    pub fn inter_batch_pause(&self) -> Duration {
        Duration::from_millis(self.inter_batch_pause_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_message_pause_ms: default_inter_message_pause_ms(),
            inter_batch_pause_ms: default_inter_batch_pause_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    3
}

fn default_inter_message_pause_ms() -> u64 {
    1000
}

fn default_inter_batch_pause_ms() -> u64 {
    2000
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `WHATSAPP__ACCESS_TOKEN`) overrides the file value.
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    validate(&app)?;
    Ok(app)
}

fn validate(app: &AppConfig) -> Result<(), ConfigError> {
    if app.whatsapp.access_token.is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.access_token must not be empty".into(),
        ));
    }
    if app.whatsapp.phone_number_id.is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.phone_number_id must not be empty".into(),
        ));
    }
    if app.whatsapp.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "whatsapp.request_timeout_secs must be > 0".into(),
        ));
    }
    if app.pacing.batch_size == 0 {
        return Err(ConfigError::Validation(
            "pacing.batch_size must be >= 1".into(),
        ));
    }
    Ok(())
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
