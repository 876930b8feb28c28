//! Store Goals API - multi-tenant sales goal tracking backend.
//!
//! A CRUD API consumed by a web frontend: every route authenticates a
//! manager (or owner) via bearer token, scopes its MongoDB queries to
//! that tenant, and returns JSON. The aggregation/pacing core lives in
//! `aggregate`, `pacing` and `presenters`; `recompute` is the single
//! write-back path for denormalized totals. Everything else is
//! conventional plumbing around that core.

use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aggregate;
pub mod auth;
pub mod backup;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod export;
pub mod mail;
pub mod models;
pub mod pacing;
pub mod pagination;
pub mod presenters;
pub mod rate_limit;
pub mod recompute;
pub mod routes;
pub mod state;

/// Initialize logging, connect to Mongo, and serve until shutdown.
pub async fn run() -> Result<(), String> {
    let config = config::Config::from_env()?;

    // Structured logging: console + daily rolling file.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,store_goals_api=debug"));

    std::fs::create_dir_all(&config.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "api");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the process; dropping it
    // flushes logs. We leak it intentionally since the server runs until
    // process exit.
    std::mem::forget(guard);

    error::set_dev_mode(config.environment.is_development());
    info!(
        env = config.environment.as_str(),
        "Starting Store Goals API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = db::Db::connect(&config.mongo_uri, &config.mongo_db)
        .await
        .map_err(|err| format!("mongo connect: {err}"))?;
    db.ensure_indexes()
        .await
        .map_err(|err| format!("ensure indexes: {err}"))?;

    let mailer = match config.smtp.as_ref() {
        Some(smtp) => Some(mail::Mailer::new(smtp).map_err(|err| err.to_string())?),
        None => None,
    };
    if mailer.is_none() {
        info!("SMTP not configured; mail endpoints disabled");
    }

    let auth_limiter =
        rate_limit::RateLimiter::new(config.auth_rate_max, config.auth_rate_window_secs);

    let bind_addr = config.bind_addr.clone();
    let shared = std::sync::Arc::new(state::AppState {
        config,
        db,
        mailer,
        auth_limiter,
    });

    let app = routes::router(shared)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| format!("bind {bind_addr}: {err}"))?;
    info!(addr = %bind_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| format!("server error: {err}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
