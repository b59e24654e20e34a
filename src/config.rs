//! Service configuration from the environment (`.env` is loaded in `main`).

use std::env;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub razorpay: RazorpayConfig,
    pub tracking_url_template: String,
    pub default_courier: String,
    pub return_window_days: i64,
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(key));
        let port = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT", v))?,
            None => 8083,
        };
        let return_window_days = match lookup("RETURN_WINDOW_DAYS") {
            Some(v) => v.parse().ok().filter(|d: &i64| *d >= 0).ok_or(ConfigError::Invalid("RETURN_WINDOW_DAYS", v))?,
            None => 2,
        };
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port,
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            razorpay: RazorpayConfig {
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_KEY_SECRET")?,
                base_url: lookup("RAZORPAY_BASE_URL").unwrap_or_else(|| "https://api.razorpay.com".to_string()),
            },
            tracking_url_template: lookup("TRACKING_URL_TEMPLATE")
                .unwrap_or_else(|| "https://shiprocket.co/tracking/{awb}".to_string()),
            default_courier: lookup("DEFAULT_COURIER").unwrap_or_else(|| "Shiprocket".to_string()),
            return_window_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "s3cret"),
        ])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.return_window_days, 2);
        assert!(cfg.nats_url.is_none());
        assert!(cfg.tracking_url_template.contains("{awb}"));
    }

    #[test]
    fn test_missing_and_invalid() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("PORT", "eighty".into()));
    }
}
