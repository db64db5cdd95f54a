mod config;

use tracing::{info, warn};

use sahyog_api::AppStateInner;
use sahyog_api::auth::ensure_admin;
use sahyog_db::Database;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sahyog=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = match &config.db_path {
        Some(path) => Database::open(path)?,
        None => {
            warn!("SAHYOG_DB_PATH not set, data lives in memory and is lost on exit");
            Database::open_in_memory()?
        }
    };

    let state = AppStateInner::new(db, config.jwt_secret.clone(), config.token_ttl);

    if let Some(admin) = &config.admin {
        ensure_admin(&state, &admin.name, &admin.email, &admin.password).await?;
    }

    let app = sahyog_api::router(state);

    info!("Sahyog server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
