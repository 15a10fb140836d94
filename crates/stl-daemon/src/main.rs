//! stl-daemon entry point.
//!
//! Thin: sets up tracing, loads config, builds the shared state, starts the
//! poller and the HTTP server. Route handlers live in `routes.rs`; shared
//! state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use stl_daemon::{poller, routes, state};
use stl_directory::{load_settlement_config, secrets::resolve_secrets, Profile};
use stl_ledger::JsonRpcGateway;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let profile: Profile = std::env::var("STL_PROFILE")
        .unwrap_or_else(|_| "demo".to_string())
        .parse()?;
    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();

    let cfg = load_settlement_config(profile, &path_refs)?;
    let secrets = resolve_secrets(&cfg.settings.ledger, cfg.profile)?;
    info!(
        profile = cfg.profile.as_str(),
        config_hash = %cfg.loaded.config_hash,
        partners = cfg.directory.partners().len(),
        "config loaded"
    );

    let gateway = JsonRpcGateway::new(
        cfg.settings.ledger.rpc_url.clone(),
        Duration::from_secs(cfg.settings.ledger.request_timeout_secs),
    )
    .context("ledger gateway init failed")?
    .with_auth_token(secrets.rpc_auth_token);

    let shared = Arc::new(state::AppState::new(cfg, Box::new(gateway)));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    let poller = poller::spawn_poller(Arc::clone(&shared));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8898)));
    info!("stl-daemon listening on http://{}", addr);

    let on_shutdown = Arc::clone(&shared);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            on_shutdown.request_shutdown();
        })
        .await
        .context("server crashed")?;

    let _ = poller.await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("STL_DAEMON_ADDR").ok()?.parse().ok()
}

/// `STL_CONFIG`: comma-separated YAML paths, merged in order.
fn config_paths_from_env() -> Vec<String> {
    std::env::var("STL_CONFIG")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
