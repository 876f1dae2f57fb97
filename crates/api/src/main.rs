use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use domain::services::{load_or_create_identity, DeviceRecordStore, SessionState};
use persistence::{DeviceRecordRepository, FileKeyValueStore, InMemoryDeviceRecords};
use share_location_api::{
    app,
    config::{Config, RecordsBackend},
    middleware,
    services::{build_location_source, SharingController, SharingDeps, SharingSettings},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    let identity_store = FileKeyValueStore::new(&config.identity.path)
        .with_expiration(config.identity.expires_secs.map(chrono::Duration::seconds));

    if std::env::args().nth(1).as_deref() == Some("reset-identity") {
        identity_store.remove().await?;
        info!(path = %identity_store.path().display(), "Device identity removed");
        return Ok(());
    }

    info!("Starting Share Location v{}", env!("CARGO_PKG_VERSION"));

    let identity = load_or_create_identity(&identity_store).await;
    info!(
        device_id = %identity.device_id,
        created = identity.created,
        "Device identity loaded"
    );

    let records: Arc<dyn DeviceRecordStore> = match config.records.backend {
        RecordsBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database).await?;

            info!("Running database migrations...");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");

            Arc::new(DeviceRecordRepository::new(pool))
        }
        RecordsBackend::Memory => {
            warn!("Device records are kept in memory and lost on exit");
            Arc::new(InMemoryDeviceRecords::new())
        }
    };

    let location = build_location_source(&config.location)?;

    let (controller, session_task) = SharingController::spawn(
        SessionState::new(identity.device_id, config.device.device_type.clone()),
        SharingDeps { records, location },
        SharingSettings {
            sampling_interval: config.sharing.sampling_interval(),
            stop_grace: config.sharing.stop_grace(),
        },
    );

    let app = app::create_app(config.clone(), controller.clone());

    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leave the remote record inactive when the process exits mid-session.
    if controller.state().is_active() {
        match controller.stop().await {
            Ok(_) => info!("Sharing stopped on shutdown"),
            Err(e) => warn!(error = %e, "Could not stop sharing on shutdown"),
        }
    }

    drop(controller);
    let grace = config.sharing.stop_grace() + Duration::from_secs(1);
    if tokio::time::timeout(grace, session_task).await.is_err() {
        warn!("Sharing session did not close in time");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
