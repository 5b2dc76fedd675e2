mod auth;
mod config;
mod db;
mod errors;
mod feedback;
mod interviews;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::identity::FirebaseIdentity;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mockline API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize identity provider
    let identity = Arc::new(FirebaseIdentity::new(
        config.identity_project_id.clone(),
        config.identity_api_key.clone(),
    )?);
    info!(
        "Identity provider initialized (project: {})",
        config.identity_project_id
    );
    if !config.secure_cookies {
        info!("Session cookies are not marked Secure (APP_ENV is not production)");
    }

    let state = AppState {
        store,
        llm,
        identity,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the web origin so the session cookie can be sent cross-site

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
