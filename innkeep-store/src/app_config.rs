use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
    pub business_rules: BusinessRules,
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_seconds: i64,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_signature_tolerance() -> i64 { 300 }
fn default_api_base() -> String { "https://api.stripe.com".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub tax_rate: f64,
    /// Flat fee added at checkout, minor units.
    pub service_fee_minor: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String { "inr".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationsConfig {
    pub hotel_name: String,
    pub email_from: String,
    /// Outbound booking webhook. Unset or empty disables the channel.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_webhook_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetentionConfig {
    pub window_days: u32,
    pub sweep_interval_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            sweep_interval_seconds: 24 * 60 * 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. INNKEEP__PAYMENT__WEBHOOK_SECRET=whsec_...
            .add_source(config::Environment::with_prefix("INNKEEP").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that deserialize fine but cannot run.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.payment.webhook_secret.trim().is_empty() {
            return Err(config::ConfigError::Message("payment.webhook_secret must not be empty".to_string()));
        }
        if self.retention.sweep_interval_seconds == 0 {
            return Err(config::ConfigError::Message(
                "retention.sweep_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TOML: &str = include_str!("../../config/default.toml");

    fn from_toml(extra: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_TOML, config::FileFormat::Toml))
            .add_source(config::File::from_str(extra, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_file_deserializes() {
        let config = from_toml("");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.business_rules.tax_rate, 0.18);
        assert_eq!(config.business_rules.service_fee_minor, 25_000);
        assert_eq!(config.payment.signature_tolerance_seconds, 300);
        assert_eq!(config.retention.window_days, 30);
        assert_eq!(config.notifications.retry.max_attempts, 3);
        assert!(config.notifications.webhook_url.is_none());
    }

    #[test]
    fn test_overrides_layer_on_top() {
        let config = from_toml(
            r#"
            [notifications]
            hotel_name = "Test Inn"
            email_from = "desk@test.example"
            webhook_url = "http://localhost:9000/hook"

            [retention]
            window_days = 7
            sweep_interval_seconds = 60
            "#,
        );
        assert_eq!(config.notifications.hotel_name, "Test Inn");
        assert_eq!(config.notifications.webhook_url.as_deref(), Some("http://localhost:9000/hook"));
        assert_eq!(config.notifications.webhook_timeout_seconds, 10);
        assert_eq!(config.retention.window_days, 7);
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        assert!(from_toml("").validate().is_ok());

        let blank_secret = from_toml(
            r#"
            [payment]
            webhook_secret = " "
            "#,
        );
        let err = blank_secret.validate().unwrap_err();
        assert!(err.to_string().contains("webhook_secret"));

        let zero_interval = from_toml(
            r#"
            [retention]
            window_days = 30
            sweep_interval_seconds = 0
            "#,
        );
        let err = zero_interval.validate().unwrap_err();
        assert!(err.to_string().contains("sweep_interval_seconds"));
    }
}
