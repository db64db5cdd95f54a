use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    /// `None` keeps everything in memory for the life of the process.
    pub db_path: Option<PathBuf>,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub admin: Option<AdminAccount>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("SAHYOG_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SAHYOG_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = var("SAHYOG_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("SAHYOG_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("SAHYOG_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let ttl_hours: i64 = var("SAHYOG_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".into())
            .parse()
            .context("SAHYOG_TOKEN_TTL_HOURS must be a whole number of hours")?;
        if ttl_hours <= 0 {
            bail!("SAHYOG_TOKEN_TTL_HOURS must be positive");
        }

        let admin = match (
            var("SAHYOG_ADMIN_EMAIL"),
            var("SAHYOG_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(AdminAccount {
                name: var("SAHYOG_ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                email,
                password,
            }),
            (None, None) => None,
            _ => bail!("SAHYOG_ADMIN_EMAIL and SAHYOG_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            jwt_secret,
            db_path: var("SAHYOG_DB_PATH").map(PathBuf::from),
            addr,
            token_ttl: chrono::Duration::hours(ttl_hours),
            admin,
        })
    }
}
