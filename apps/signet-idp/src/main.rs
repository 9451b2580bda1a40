//! signet identity provider binary.
//!
//! Wires configuration, the database pool, the session binder and the social
//! authentication router into one HTTP service.

mod config;
mod session;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use session::{session_layer, JwtSessionBinder};
use signet_social::{social_router, SocialState};

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,signet_social=debug")),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    tracing::info!(
        listen_addr = %config.listen_addr,
        base_url = %config.social.base_url,
        "starting signet-idp"
    );

    // Create database pool
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Database connection error: {e}");
            std::process::exit(1);
        });

    // Apply schema migrations
    signet_db::migrations::run(&pool).await.unwrap_or_else(|e| {
        eprintln!("Migration error: {e}");
        std::process::exit(1);
    });

    let binder = Arc::new(JwtSessionBinder::new(
        &config.session_secret,
        config.session_ttl_secs,
    ));

    let social_state = SocialState::new(&config.social, pool, binder.clone());

    let app = Router::new()
        .route("/health", get(health))
        .nest(
            "/auth/social",
            social_router()
                .layer(middleware::from_fn(move |request, next| {
                    session_layer(binder.clone(), request, next)
                }))
                .with_state(social_state),
        );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Bind error: {e}");
            std::process::exit(1);
        });

    tracing::info!(listen_addr = %config.listen_addr, "signet-idp listening");

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    });
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}
