use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, routing::get};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

use config::{Config, StoreBackend};
use session::SessionKeys;
use state::AppState;
use store::{FoodStore, MemoryStore, MongoStore};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .merge(routes::api_router(state))
        // credentials must be allowed for the session cookie to cross origins
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root_handler() -> &'static str {
    "This is FoodHive server"
}

pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn FoodStore>> {
    match config.store {
        StoreBackend::Mongo => {
            let uri = config.mongodb_uri()?;
            let store = MongoStore::connect(&uri, &config.db_name)
                .await
                .context("failed to connect to MongoDB")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store, data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Initializing store...");
    let store = open_store(&config).await?;
    let sessions = SessionKeys::new(&config.token_secret, config.is_production());
    let app = app(AppState::new(store.clone(), sessions));

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("FoodHive server is running at {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutting down...");
    store.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
