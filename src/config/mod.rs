use std::path::PathBuf;

use chrono::Duration;
use mongodb::{Client, Database};
use thiserror::Error;

const DEFAULT_DATABASE: &str = "devcamper";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub provider: String,
    pub api_key: String,
}

/// Runtime settings, assembled once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_uri: String,
    pub database_name: Option<String>,
    pub environment: Environment,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expire: Duration,
    pub jwt_cookie_expire_days: i64,
    pub file_upload_path: PathBuf,
    pub max_file_upload: usize,
    pub smtp: SmtpConfig,
    pub geocoder: GeocoderConfig,
    pub frontend_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let environment = match get("NODE_ENV")
            .or_else(|| get("ENVIRONMENT"))
            .as_deref()
            .unwrap_or("development")
        {
            "production" => Environment::Production,
            "development" | "test" => Environment::Development,
            other => {
                return Err(ConfigError::Invalid {
                    key: "NODE_ENV",
                    value: other.to_string(),
                })
            }
        };

        let jwt_expire_raw = or("JWT_EXPIRE", "30d");
        let jwt_expire = parse_duration(&jwt_expire_raw).ok_or(ConfigError::Invalid {
            key: "JWT_EXPIRE",
            value: jwt_expire_raw,
        })?;

        Ok(Config {
            database_uri: require("DB_CONNECTION")?,
            database_name: get("DATABASE_NAME"),
            environment,
            port: parse("PORT", or("PORT", "5000"))?,
            jwt_secret: require("JWT_SECRET")?,
            jwt_expire,
            jwt_cookie_expire_days: parse("JWT_COOKIE_EXPIRE", or("JWT_COOKIE_EXPIRE", "30"))?,
            file_upload_path: PathBuf::from(or("FILE_UPLOAD_PATH", "./public/uploads")),
            max_file_upload: parse("MAX_FILE_UPLOAD", or("MAX_FILE_UPLOAD", "1000000"))?,
            smtp: SmtpConfig {
                host: or("SMTP_HOST", "sandbox.smtp.mailtrap.io"),
                port: parse("SMTP_PORT", or("SMTP_PORT", "2525"))?,
                username: or("SMTP_EMAIL", ""),
                password: or("SMTP_PASSWORD", ""),
                from_email: or("FROM_EMAIL", "noreply@devcamper.io"),
                from_name: or("FROM_NAME", "DevCamper"),
            },
            geocoder: GeocoderConfig {
                provider: or("GEOCODER_PROVIDER", "mapquest"),
                api_key: or("GEOCODER_API_KEY", ""),
            },
            frontend_url: get("FRONTEND_URL"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

/// Parses `30d`, `12h`, `15m`, `45s`, `2w` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(index) => raw.split_at(index),
        None => (raw, "s"),
    };
    let amount: i64 = digits.parse().ok()?;
    match unit.trim() {
        "s" => Some(Duration::seconds(amount)),
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        "w" => Some(Duration::weeks(amount)),
        _ => None,
    }
}

pub async fn init_database(config: &Config) -> mongodb::error::Result<Database> {
    let client = Client::with_uri_str(&config.database_uri).await?;

    let database = match &config.database_name {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
    };

    log::info!("Using MongoDB database {}", database.name());
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DB_CONNECTION", "mongodb://localhost:27017"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.jwt_expire, Duration::days(30));
        assert_eq!(config.jwt_cookie_expire_days, 30);
        assert_eq!(config.max_file_upload, 1_000_000);
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.geocoder.provider, "mapquest");
        assert!(config.frontend_url.is_none());
    }

    #[test]
    fn requires_secret_and_connection() {
        let err = Config::from_lookup(lookup(&[("DB_CONNECTION", "mongodb://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DB_CONNECTION")));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("DB_CONNECTION", "mongodb://x"),
            ("JWT_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn production_mode() {
        let config = Config::from_lookup(lookup(&[
            ("DB_CONNECTION", "mongodb://x"),
            ("JWT_SECRET", "s"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("30d"), Some(Duration::days(30)));
        assert_eq!(parse_duration("12h"), Some(Duration::hours(12)));
        assert_eq!(parse_duration("90"), Some(Duration::seconds(90)));
        assert_eq!(parse_duration("2w"), Some(Duration::weeks(2)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5y"), None);
    }
}
