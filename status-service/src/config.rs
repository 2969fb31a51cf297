//! Runtime settings, read from command-line flags with environment fallbacks.

use crate::errors::Result;
use clap::{ArgAction, Args, Parser};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::str::FromStr;

pub const DEFAULT_LOG_FILTER: &str = "info,status_service=debug,tower_http=debug";
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Records and serves IoT device status reports",
    long_about = None
)]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    #[command(flatten)]
    pub database: DatabaseSettings,

    #[command(flatten)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the individual DB_* settings
    #[arg(long = "database-url", env = "DATABASE_URL", hide_env_values = true)]
    pub url: Option<String>,

    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,

    #[arg(long = "db-user", env = "DB_USER", default_value = "postgres")]
    pub user: String,

    #[arg(
        long = "db-password",
        env = "DB_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    #[arg(long = "db-name", env = "DB_NAME", default_value = "iot_devices")]
    pub name: String,

    #[arg(long = "db-max-connections", env = "DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    #[arg(
        long = "db-acquire-timeout-secs",
        env = "DB_ACQUIRE_TIMEOUT_SECS",
        default_value_t = 10
    )]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct HttpSettings {
    /// Attach the CORS layer
    #[arg(long = "cors", env = "CORS_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub cors_enabled: bool,

    /// Comma-separated allowed origins, `*` for any
    #[arg(
        long = "cors-origins",
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes
    #[arg(
        long = "max-body-bytes",
        env = "MAX_BODY_BYTES",
        default_value_t = DEFAULT_MAX_BODY_BYTES
    )]
    pub max_body_bytes: usize,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.url {
            Some(url) => Ok(PgConnectOptions::from_str(url)?),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)
                .ssl_mode(PgSslMode::Disable)),
        }
    }

    /// Connection target without credentials, for logging.
    pub fn redacted_target(&self) -> String {
        match &self.url {
            Some(url) => url.rsplit('@').next().unwrap_or("***").to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.name),
        }
    }
}

impl HttpSettings {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin.trim() == "*")
    }
}
