/// Configuration management for the API server
///
/// Configuration is read from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: bind host (default: 0.0.0.0)
/// - `API_PORT`: bind port (default: 3000)
/// - `CORS_ORIGINS`: comma separated origins, `*` for any (default: *)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `PUBLIC_URL`: base URL used in invitation links (default: http://localhost:3000)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: token verification secret, at least 32 characters (required)
/// - `INVITE_TTL_SECS`: invitation lifetime (default: 86400)
/// - `REDIS_URL`: Redis for invitations; in-memory when unset
/// - `REDIS_COMMAND_TIMEOUT_SECS`: per-command Redis timeout (default: 5)

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use vexa_shared::invites::DEFAULT_COMMAND_TIMEOUT_SECS;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub invites: InviteConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    pub production: bool,

    /// Externally visible base URL, without trailing slash
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteConfig {
    pub ttl_secs: i64,
    pub redis_url: Option<String>,
    pub redis_command_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let public_url = var("PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(var("API_PORT"), "API_PORT", 3000)?,
                cors_origins,
                production: parse_or(var("PRODUCTION"), "PRODUCTION", false)?,
                public_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(
                    var("DATABASE_MAX_CONNECTIONS"),
                    "DATABASE_MAX_CONNECTIONS",
                    10,
                )?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            invites: InviteConfig {
                ttl_secs: parse_or(var("INVITE_TTL_SECS"), "INVITE_TTL_SECS", 86_400)?,
                redis_url: var("REDIS_URL"),
                redis_command_timeout_secs: parse_or(
                    var("REDIS_COMMAND_TIMEOUT_SECS"),
                    "REDIS_COMMAND_TIMEOUT_SECS",
                    DEFAULT_COMMAND_TIMEOUT_SECS,
                )?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}")),
        None => Ok(default),
    }
}
