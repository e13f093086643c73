use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Environment variables consulted on top of the compiled defaults.
const ENV_KEYS: &[&str] = &[
    "NODE_ENV",
    "PORT",
    "DATABASE_URL",
    "JWT_SECRET",
    "ERP_SECRET_KEY",
    "ENCRYPTION_SECRET",
    "CORS_ORIGIN",
    "LOG_LEVEL",
    "REQUEST_BODY_LIMIT",
    "RATE_LIMIT_WINDOW_MS",
    "RATE_LIMIT_MAX",
    "SHUTDOWN_TIMEOUT_MS",
    "ERP_TIMEOUT_SECS",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "S3_BUCKET_NAME",
    "S3_REGION",
];

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node_env: Environment,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// 64 hex characters; the AES-256-GCM key for stored ERP credentials.
    pub erp_secret_key: String,
    /// Source of the legacy AES-256-CBC key (first 32 bytes).
    pub encryption_secret: String,
    pub cors_origin: String,
    pub log_level: String,
    pub request_body_limit: usize,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
    pub shutdown_timeout_ms: u64,
    pub erp_timeout_secs: u64,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub s3_bucket_name: String,
    pub s3_region: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_env: Environment::Development,
            port: 3000,
            database_url: "sqlite:erpnext_bridge.db".to_string(),
            jwt_secret: String::new(),
            erp_secret_key: String::new(),
            encryption_secret: String::new(),
            cors_origin: "*".to_string(),
            log_level: "info".to_string(),
            request_body_limit: 900 * 1024,
            rate_limit_window_ms: 60_000,
            rate_limit_max: 200,
            shutdown_timeout_ms: 30_000,
            erp_timeout_secs: 30,
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
            s3_bucket_name: String::new(),
            s3_region: String::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("node_env", &self.node_env)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("cors_origin", &self.cors_origin)
            .field("log_level", &self.log_level)
            .field("request_body_limit", &self.request_body_limit)
            .field("rate_limit_window_ms", &self.rate_limit_window_ms)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("shutdown_timeout_ms", &self.shutdown_timeout_ms)
            .field("erp_timeout_secs", &self.erp_timeout_secs)
            .field("s3_bucket_name", &self.s3_bucket_name)
            .field("s3_region", &self.s3_region)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Defaults, overridden by the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(ENV_KEYS))
            .extract()
            .map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(invalid("DATABASE_URL", "DATABASE_URL is required"));
        }
        if self.jwt_secret.chars().count() < 10 {
            return Err(invalid(
                "JWT_SECRET",
                "JWT_SECRET must be at least 10 characters",
            ));
        }
        match hex::decode(self.erp_secret_key.trim()) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => {
                return Err(invalid(
                    "ERP_SECRET_KEY",
                    format!(
                        "invalid length: {} bytes (expected 32 bytes for aes-256-gcm)",
                        bytes.len()
                    ),
                ));
            }
            Err(_) => {
                return Err(invalid(
                    "ERP_SECRET_KEY",
                    "ERP_SECRET_KEY must be a valid hex string",
                ));
            }
        }
        if self.encryption_secret.len() < 32 {
            return Err(invalid(
                "ENCRYPTION_SECRET",
                "ENCRYPTION_SECRET must be at least 32 characters",
            ));
        }
        if self.rate_limit_max == 0 {
            return Err(invalid("RATE_LIMIT_MAX", "must be greater than zero"));
        }
        if self.rate_limit_window_ms == 0 {
            return Err(invalid("RATE_LIMIT_WINDOW_MS", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.node_env == Environment::Production
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn erp_timeout(&self) -> Duration {
        Duration::from_secs(self.erp_timeout_secs)
    }

    /// `None` means any origin.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let raw = self.cors_origin.trim();
        if raw.is_empty() || raw == "*" {
            return None;
        }
        Some(
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn s3_configured(&self) -> bool {
        [
            &self.aws_access_key_id,
            &self.aws_secret_access_key,
            &self.s3_bucket_name,
            &self.s3_region,
        ]
        .iter()
        .all(|v| !v.is_empty())
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}
