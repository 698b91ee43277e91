//! Configuration settings for the payment gateway.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::GateError;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// Maximum accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Path to the shared HMAC secret used for direct payment submissions.
    pub hmac_secret_path: PathBuf,
    /// Path to the provider's webhook signing secret.
    pub webhook_secret_path: PathBuf,
    /// Maximum tolerated timestamp skew, in either direction.
    #[serde(default = "default_replay_window")]
    pub replay_window_seconds: u64,
    /// Maximum requests per client address per window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,
    /// Rate limit window in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
}

/// Idempotency ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencyConfig {
    /// How long resolved outcomes are kept before eviction.
    #[serde(default = "default_retention")]
    pub retention_seconds: u64,
    /// How long an in-flight entry blocks retries before it may be taken over.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
    /// Interval of the background purge task.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

/// Payment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// The only amount (minor units) a submission may charge.
    #[serde(default = "default_expected_amount")]
    pub expected_amount: u64,
    /// ISO 4217 currency, lowercase.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Base URL of the processor API.
    #[serde(default = "default_provider_api_base")]
    pub provider_api_base: String,
    /// Path to the processor API key.
    pub provider_api_key_path: PathBuf,
    /// Timeout applied to every processor call.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

// Default value functions
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_request_timeout() -> u64 {
    30
}

fn default_replay_window() -> u64 {
    300
}

fn default_rate_limit_requests() -> usize {
    100
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_retention() -> u64 {
    86_400
}

fn default_lease() -> u64 {
    30
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_expected_amount() -> u64 {
    2_500_000
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_provider_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/payment-gate/audit.log")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            retention_seconds: default_retention(),
            lease_seconds: default_lease(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GateError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| GateError::Config {
            message: format!("Invalid config file '{}': {}", path.display(), e),
        })?;

        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, GateError> {
        let settings: Settings = toml::from_str(content).map_err(|e| GateError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), GateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.security.replay_window_seconds == 0 {
            return Err(GateError::Config {
                message: "security.replay_window_seconds must be greater than zero".to_string(),
            });
        }

        if self.idempotency.lease_seconds == 0 {
            return Err(GateError::Config {
                message: "idempotency.lease_seconds must be greater than zero".to_string(),
            });
        }

        if self.idempotency.retention_seconds < self.idempotency.lease_seconds {
            return Err(GateError::Config {
                message: format!(
                    "idempotency.retention_seconds ({}) must not be shorter than lease_seconds ({})",
                    self.idempotency.retention_seconds, self.idempotency.lease_seconds
                ),
            });
        }

        if self.idempotency.cleanup_interval_seconds == 0 {
            return Err(GateError::Config {
                message: "idempotency.cleanup_interval_seconds must be greater than zero"
                    .to_string(),
            });
        }

        if self.security.rate_limit_window_seconds == 0 {
            return Err(GateError::Config {
                message: "security.rate_limit_window_seconds must be greater than zero"
                    .to_string(),
            });
        }

        // A handler still running after its lease lapses could see its key
        // taken over by a retry; the request timeout bounds every handler.
        if self.idempotency.lease_seconds < self.server.request_timeout_seconds {
            return Err(GateError::Config {
                message: format!(
                    "idempotency.lease_seconds ({}) must not be shorter than server.request_timeout_seconds ({})",
                    self.idempotency.lease_seconds, self.server.request_timeout_seconds
                ),
            });
        }

        if self.payments.provider_timeout_seconds == 0
            || self.payments.provider_timeout_seconds >= self.server.request_timeout_seconds
        {
            return Err(GateError::Config {
                message: format!(
                    "payments.provider_timeout_seconds ({}) must be non-zero and shorter than server.request_timeout_seconds ({})",
                    self.payments.provider_timeout_seconds, self.server.request_timeout_seconds
                ),
            });
        }

        if self.payments.expected_amount == 0 {
            return Err(GateError::Config {
                message: "payments.expected_amount must be greater than zero".to_string(),
            });
        }

        let currency = &self.payments.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid currency '{}'. Must be a three-letter ISO 4217 code",
                    currency
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [security]
        hmac_secret_path = "/etc/payment-gate/hmac.key"
        webhook_secret_path = "/etc/payment-gate/webhook.key"

        [payments]
        provider_api_key_path = "/etc/payment-gate/provider.key"
    "#;

    #[test]
    fn test_default_values() {
        let settings = Settings::from_toml(MINIMAL).unwrap();
        assert_eq!(settings.security.replay_window_seconds, 300);
        assert_eq!(settings.idempotency.retention_seconds, 86_400);
        assert_eq!(settings.payments.expected_amount, 2_500_000);
        assert_eq!(settings.payments.currency, "usd");
        assert_eq!(settings.server.max_body_bytes, 64 * 1024);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let content = format!("{}\n[logging]\nlevel = \"loud\"\n", MINIMAL);
        assert!(matches!(
            Settings::from_toml(&content),
            Err(GateError::Config { .. })
        ));
    }

    #[test]
    fn test_zero_replay_window_rejected() {
        let content = MINIMAL.replace(
            "webhook_secret_path = \"/etc/payment-gate/webhook.key\"",
            "webhook_secret_path = \"/etc/payment-gate/webhook.key\"\nreplay_window_seconds = 0",
        );
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_retention_shorter_than_lease_rejected() {
        let content = format!(
            "{}\n[idempotency]\nretention_seconds = 10\nlease_seconds = 30\n",
            MINIMAL
        );
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_bad_currency_rejected() {
        let content = MINIMAL.replace(
            "provider_api_key_path",
            "currency = \"dollars\"\nprovider_api_key_path",
        );
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_provider_timeout_must_fit_request_timeout() {
        let content = MINIMAL.replace(
            "provider_api_key_path",
            "provider_timeout_seconds = 30\nprovider_api_key_path",
        );
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_lease_shorter_than_request_timeout_rejected() {
        let content = format!(
            "{}\n[idempotency]\nlease_seconds = 5\n",
            MINIMAL.replace(
                "provider_api_key_path",
                "provider_timeout_seconds = 10\nprovider_api_key_path",
            )
        );
        assert!(matches!(
            Settings::from_toml(&content),
            Err(GateError::Config { .. })
        ));

        let content = format!(
            "{}\n[server]\nrequest_timeout_seconds = 20\n[idempotency]\nlease_seconds = 20\n",
            MINIMAL
        );
        let settings = Settings::from_toml(&content).unwrap();
        assert_eq!(settings.idempotency.lease_seconds, 20);
    }

    #[test]
    fn test_zero_cleanup_interval_rejected() {
        let content = format!("{}\n[idempotency]\ncleanup_interval_seconds = 0\n", MINIMAL);
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_zero_rate_limit_window_rejected() {
        let content = MINIMAL.replace(
            "webhook_secret_path = \"/etc/payment-gate/webhook.key\"",
            "webhook_secret_path = \"/etc/payment-gate/webhook.key\"\nrate_limit_window_seconds = 0",
        );
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_missing_security_section_rejected() {
        let content = r#"
            [payments]
            provider_api_key_path = "/etc/payment-gate/provider.key"
        "#;
        assert!(Settings::from_toml(content).is_err());
    }
}
