// Framework bootstrap for the game server runtime.

use crate::domain::Tuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{debug_state_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{Game, GameEvent, GameSettings, world_task};

use axum::{Router, routing::get};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, mpsc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn settings() -> GameSettings {
    let mut tuning = Tuning::default();
    tuning.projectile.gc = config::projectile_gc();

    GameSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        outbound_channel_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        teardown_delay: config::TEARDOWN_DELAY,
        tuning,
    }
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let settings = settings();
    tracing::debug!(?settings, "game settings");

    // Setup Channels
    // input_tx/rx: every connection's events go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.input_channel_capacity);
    let shutdown = Arc::new(Notify::new());

    // Spawn the Game Loop (World Task)
    let game = Game::new(settings.tuning, StdRng::from_entropy());
    let world = tokio::spawn(world_task(
        game,
        input_rx,
        input_tx.clone(),
        settings.tick_interval,
        settings.teardown_delay,
        Arc::clone(&shutdown),
    ));

    let state = Arc::new(AppState {
        input_tx,
        outbound_channel_capacity: settings.outbound_channel_capacity,
    });

    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/debug/state", get(debug_state_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    shutdown.notify_one();
    if let Err(e) = world.await {
        tracing::error!(error = %e, "world task failed");
    }
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        // Without a signal handler keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
