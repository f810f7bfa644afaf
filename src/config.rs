//! Application configuration parsed from environment variables.
//!
//! `main` loads `.env` through `dotenvy` first, so every key below may come
//! from the process environment or a local dotenv file.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_NAME: &str = "community";
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = 9;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// FCM HTTP v1 credentials. Absent when either variable is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    /// Passphrase for telephone encryption. Registration is refused without it.
    pub crypto_key: Option<String>,
    /// Offset of the service timezone; the realtime day starts at local midnight.
    pub utc_offset_hours: i8,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub fcm: Option<FcmConfig>,
    pub webpush_gateway_url: Option<String>,
    pub push_timeout_secs: u64,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `MONGODB_URI`
    /// - `JWT_SECRET`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `MONGODB_DB`: default `community`
    /// - `CRYPTO_KEY`
    /// - `REALTIME_UTC_OFFSET_HOURS`: default 9, range -12..=14
    /// - `UPLOAD_DIR`: default `./uploads`
    /// - `PUBLIC_BASE_URL`: prefix for uploaded image URLs, default empty
    /// - `FCM_PROJECT_ID` + `FCM_ACCESS_TOKEN`
    /// - `WEBPUSH_GATEWAY_URL`
    /// - `PUSH_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required key is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT", DEFAULT_PORT)?;
        let mongodb_uri = required("MONGODB_URI")?;
        let database_name = optional("MONGODB_DB").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_owned());
        let jwt_secret = required("JWT_SECRET")?;
        let crypto_key = optional("CRYPTO_KEY");

        let utc_offset_hours = env_parse("REALTIME_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(ConfigError::Invalid {
                key: "REALTIME_UTC_OFFSET_HOURS",
                value: utc_offset_hours.to_string(),
            });
        }

        let upload_dir = optional("UPLOAD_DIR").map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from);
        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_owned();

        let fcm = match (optional("FCM_PROJECT_ID"), optional("FCM_ACCESS_TOKEN")) {
            (Some(project_id), Some(access_token)) => Some(FcmConfig { project_id, access_token }),
            _ => None,
        };
        let webpush_gateway_url = optional("WEBPUSH_GATEWAY_URL");
        let push_timeout_secs = env_parse("PUSH_TIMEOUT_SECS", DEFAULT_PUSH_TIMEOUT_SECS)?;

        Ok(Self {
            port,
            mongodb_uri,
            database_name,
            jwt_secret,
            crypto_key,
            utc_offset_hours,
            upload_dir,
            public_base_url,
            fcm,
            webpush_gateway_url,
            push_timeout_secs,
        })
    }
}

/// Non-empty value of `key`, trimmed.
fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
