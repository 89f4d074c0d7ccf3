use anyhow::Context;
use std::sync::Arc;
use storesync_agent::{AppState, BridgeHost, Engine, HttpStoreApi, Presence, create_app, helpers};
use storesync_core::CycleOutcome;
use tokio::net::TcpListener;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting storesync agent...");

    let config = storesync_agent::config::Config::from_env();
    tracing::info!(
        "Configuration: store_url={}, bridge={}:{}, body_limit={}KB, timeout={}s, cache_lifetime={}m",
        config.store_api_url,
        config.bridge_bind,
        config.bridge_port,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
        config.cache_lifetime_minutes
    );
    tracing::info!(
        "Ticks: queue={}s, maintenance={}s, auto_reporting={}, debug_mode={}",
        config.queue_tick.as_secs(),
        config.maintenance_tick.as_secs(),
        config.auto_reporting_enabled,
        config.debug_mode
    );

    let api = HttpStoreApi::new(
        &config.store_api_url,
        config.secret_key.clone(),
        config.request_timeout,
        config.debug_mode,
    )
    .context("failed to build store client")?;
    let presence = Arc::new(Presence::new());
    let host = BridgeHost::new(presence, config.server_ip.clone());
    let engine: Arc<Engine> = Arc::new(Engine::new(
        Arc::new(api),
        Arc::new(host),
        &config.sync_settings(),
    ));

    let bridge_token = match &config.bridge_token {
        Some(token) => token.clone(),
        None => {
            let token = helpers::generate_bridge_token();
            tracing::warn!("BRIDGE_TOKEN not set, generated token for this run: {}", token);
            token
        }
    };

    // Warm the cache before the first tick
    let (information, listing) = tokio::join!(
        engine.catalog.refresh_information(),
        engine.catalog.refresh_listings()
    );
    if !information || !listing.is_complete() {
        tracing::warn!("Initial catalog refresh incomplete, retrying on maintenance tick");
    }

    let app = create_app(
        Arc::new(AppState::new(engine.clone(), &bridge_token)),
        config.request_body_limit,
        config.request_timeout,
    );
    let addr = format!("{}:{}", config.bridge_bind, config.bridge_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind bridge on {addr}"))?;
    tracing::info!("Bridge listening on {}", addr);

    let queue_engine = engine.clone();
    let queue_tick = config.queue_tick;
    let queue_loop = async move {
        let mut ticker = interval(queue_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match queue_engine.queue.process_queue().await {
                CycleOutcome::Completed { offline, online } => {
                    tracing::debug!(offline, online, "queue cycle completed");
                }
                outcome => tracing::debug!(?outcome, "queue cycle skipped"),
            }
        }
    };

    let maintenance_engine = engine.clone();
    let maintenance_tick = config.maintenance_tick;
    let maintenance_loop = async move {
        let mut ticker = interval(maintenance_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately and the cache is already warm
        ticker.tick().await;
        loop {
            ticker.tick().await;
            maintenance_engine.maintain().await;
        }
    };

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("Bridge server error: {}", e);
            }
        }
        _ = queue_loop => {}
        _ = maintenance_loop => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
    }

    // Don't lose acknowledgements for commands that already ran
    engine.maintain().await;
    tracing::info!("Storesync agent stopped");
    Ok(())
}
