//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ledger::LedgerSettings;
use crate::provisioning::ProvisioningSettings;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Capacity of the notification queue
    pub notification_queue_capacity: usize,

    /// Attempts per ledger operation on concurrency conflicts
    pub transfer_max_retries: u32,

    /// Base retry delay in milliseconds
    pub transfer_retry_backoff_ms: u64,

    /// Attempts per provisioning write on concurrency conflicts
    pub provisioning_max_retries: u32,

    pub provisioning_retry_backoff_ms: u64,

    /// Card validity from the issue date
    pub card_validity_years: u32,

    /// Random draws per number allocation
    pub number_allocation_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 3000)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        let notification_queue_capacity = parse_var("NOTIFICATION_QUEUE_CAPACITY", 1024)?;
        if notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("NOTIFICATION_QUEUE_CAPACITY"));
        }

        let transfer_max_retries = parse_var("TRANSFER_MAX_RETRIES", 3)?;
        if transfer_max_retries == 0 {
            return Err(ConfigError::InvalidValue("TRANSFER_MAX_RETRIES"));
        }

        let provisioning_max_retries = parse_var("PROVISIONING_MAX_RETRIES", 3)?;
        if provisioning_max_retries == 0 {
            return Err(ConfigError::InvalidValue("PROVISIONING_MAX_RETRIES"));
        }

        Ok(Self {
            host,
            port,
            environment,
            log_format,
            notification_queue_capacity,
            transfer_max_retries,
            transfer_retry_backoff_ms: parse_var("TRANSFER_RETRY_BACKOFF_MS", 50)?,
            provisioning_max_retries,
            provisioning_retry_backoff_ms: parse_var("PROVISIONING_RETRY_BACKOFF_MS", 50)?,
            card_validity_years: parse_var("CARD_VALIDITY_YEARS", 5)?,
            number_allocation_attempts: parse_var("NUMBER_ALLOCATION_ATTEMPTS", 16)?,
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            max_retries: self.transfer_max_retries,
            retry_backoff: Duration::from_millis(self.transfer_retry_backoff_ms),
        }
    }

    pub fn provisioning_settings(&self) -> ProvisioningSettings {
        ProvisioningSettings {
            card_validity_years: self.card_validity_years,
            allocation_attempts: self.number_allocation_attempts,
            max_retries: self.provisioning_max_retries,
            retry_backoff: Duration::from_millis(self.provisioning_retry_backoff_ms),
        }
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_and_invalid() {
        assert_eq!(parse_var("BANKING_CORE_TEST_UNSET_VAR", 7u32).unwrap(), 7);

        env::set_var("BANKING_CORE_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16, _> = parse_var("BANKING_CORE_TEST_BAD_PORT", 3000);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("BANKING_CORE_TEST_BAD_PORT"))
        ));
        env::remove_var("BANKING_CORE_TEST_BAD_PORT");
    }

    #[test]
    fn test_settings_projection() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "production".to_string(),
            log_format: LogFormat::Json,
            notification_queue_capacity: 8,
            transfer_max_retries: 5,
            transfer_retry_backoff_ms: 10,
            provisioning_max_retries: 6,
            provisioning_retry_backoff_ms: 20,
            card_validity_years: 3,
            number_allocation_attempts: 4,
        };

        assert_eq!(config.ledger_settings().max_retries, 5);
        assert_eq!(
            config.ledger_settings().retry_backoff,
            Duration::from_millis(10)
        );
        assert_eq!(config.provisioning_settings().card_validity_years, 3);
        assert_eq!(config.provisioning_settings().max_retries, 6);
        assert_eq!(
            config.provisioning_settings().retry_backoff,
            Duration::from_millis(20)
        );
    }
}
