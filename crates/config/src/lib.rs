//! Environment-driven configuration shared by the gateway, chat and video
//! services.
//!
//! Every service reads the same [`Settings`] struct; unset keys fall back to
//! the local development defaults (gateway 3000, auth 3001, chat 3002,
//! video 3003).

use std::collections::HashMap;
use std::env;
use thiserror::Error;

pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
pub const DEFAULT_AUTH_PORT: u16 = 3001;
pub const DEFAULT_CHAT_PORT: u16 = 3002;
pub const DEFAULT_VIDEO_PORT: u16 = 3003;

pub const DEFAULT_MONGODB_URL: &str = "mongodb://localhost:27017";
pub const DEFAULT_MONGODB_DB: &str = "huddle";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub chat: ServiceSettings,
    pub video: ServiceSettings,
    pub mongo: MongoSettings,
    pub auth: AuthSettings,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub port: u16,
    /// Upstream base URLs the gateway proxies to.
    pub auth_url: String,
    pub chat_url: String,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub url: String,
    pub database: String,
}

#[derive(Clone)]
pub struct AuthSettings {
    /// HS256 secret the token verifier validates against.
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a map (used by tests).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let gateway_port = port(vars, "GATEWAY_PORT", DEFAULT_GATEWAY_PORT)?;
        let auth_port = port(vars, "AUTH_SERVICE_PORT", DEFAULT_AUTH_PORT)?;
        let chat_port = port(vars, "CHAT_SERVICE_PORT", DEFAULT_CHAT_PORT)?;
        let video_port = port(vars, "VIDEO_SERVICE_PORT", DEFAULT_VIDEO_PORT)?;

        let auth_url = vars
            .get("AUTH_SERVICE_URL")
            .cloned()
            .unwrap_or_else(|| format!("http://localhost:{auth_port}"));
        let chat_url = vars
            .get("CHAT_SERVICE_URL")
            .cloned()
            .unwrap_or_else(|| format!("http://localhost:{chat_port}"));
        let video_url = vars
            .get("VIDEO_SERVICE_URL")
            .cloned()
            .unwrap_or_else(|| format!("http://localhost:{video_port}"));

        let cors_origins = vars
            .get("CORS_ORIGIN")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let log_level = vars
            .get("LOG_LEVEL")
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            gateway: GatewaySettings {
                port: gateway_port,
                auth_url,
                chat_url,
                video_url,
            },
            chat: ServiceSettings { port: chat_port },
            video: ServiceSettings { port: video_port },
            mongo: MongoSettings {
                url: vars
                    .get("MONGODB_URL")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_MONGODB_URL.to_string()),
                database: vars
                    .get("MONGODB_DB")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_MONGODB_DB.to_string()),
            },
            auth: AuthSettings {
                jwt_secret: vars
                    .get("JWT_SECRET")
                    .cloned()
                    .unwrap_or_else(|| "dev-secret-change-me".to_string()),
            },
            cors_origins,
            log_level,
        })
    }
}

/// Resolve a service port: the named key first, then the generic `PORT`
/// fallback, then the default.
fn port(vars: &HashMap<String, String>, key: &str, default: u16) -> Result<u16, ConfigError> {
    let raw = vars.get(key).or_else(|| vars.get("PORT"));
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
        }),
    }
}

/// Install the global tracing subscriber for a service.
///
/// `LOG_LEVEL` takes precedence, then `RUST_LOG`, then "info".
pub fn init_tracing(service: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = match env::var("LOG_LEVEL") {
        Ok(level) => tracing_subscriber::EnvFilter::new(level.to_lowercase()),
        Err(_) => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!(service, "Tracing initialized");
}
