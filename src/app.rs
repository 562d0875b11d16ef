use crate::config::Config;
use crate::detector::VehicleDetector;
use crate::ort_detector::OrtVehicleDetector;
use crate::server::HttpServer;
use crate::storage::AssetStore;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(&config.assets.directory).await?;
    let assets = AssetStore::new(config.assets.directory.clone());

    if let Err(e) = config.detector.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    let detector: Arc<dyn VehicleDetector> = match OrtVehicleDetector::new(&config.detector) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            tracing::error!("Failed to initialize vehicle detector: {:?}", e);
            return Err(e.into());
        }
    };

    let server = HttpServer::new(detector, assets, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
