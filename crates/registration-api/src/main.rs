//! Tournament registration API - Entry point.

use document_store::{AppwriteClient, CollectionRef, DocumentStore, MemoryDocumentStore};
use registration_api::{
    api::{create_app, AppState},
    config::{Config, StoreBackend},
    RegistrationAdapter,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::registry().with(filter);
    if config.log.json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }

    info!(
        "Starting {} v{} ({})",
        config.app.name, config.app.version, config.app.environment
    );

    // Initialize the document store
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Appwrite => {
            let Some(api_key) = config.appwrite.api_key.clone() else {
                error!("APPWRITE__API_KEY is not set");
                std::process::exit(1);
            };

            match AppwriteClient::new(
                &config.appwrite.endpoint,
                &config.appwrite.project_id,
                api_key,
                config.appwrite.timeout,
            ) {
                Ok(client) => {
                    info!(endpoint = %client.endpoint(), "Appwrite client initialized");
                    Arc::new(client)
                }
                Err(e) => {
                    error!("Failed to create Appwrite client: {}", e);
                    std::process::exit(1);
                }
            }
        }
        StoreBackend::Memory => {
            warn!("Using in-memory storage (registrations will be lost on restart)");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let collection = CollectionRef::new(
        config.appwrite.database_id.clone(),
        config.appwrite.collection_id.clone(),
    );
    let adapter = RegistrationAdapter::new(store, collection);

    // Create application state and router
    let state = AppState::new(adapter, config.app.clone());
    let app = create_app(state, &config);

    info!("CORS origins: {:?}", config.server.cors_origins_list());

    // Bind to address
    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server; connect info gives the rate limiter the peer address
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Shutting down {}", config.app.name);
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
