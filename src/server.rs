use crate::{
    config::Config, detector::VehicleDetector, routes::api_routes, storage::AssetStore,
    telemetry::Metrics,
};
use axum::{extract::DefaultBodyLimit, Router};
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct SharedState {
    pub detector: Arc<dyn VehicleDetector>,
    pub assets: AssetStore,
    pub metrics: Arc<Metrics>,
}

/// Full application router: pages, ambient endpoints, and the static asset
/// directory the uploads and results are served from.
pub fn build_router(state: SharedState, max_upload_bytes: usize) -> Router {
    let serve_assets = ServeDir::new(state.assets.directory());

    Router::new()
        .merge(api_routes())
        .nest_service("/static", serve_assets)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(
        detector: Arc<dyn VehicleDetector>,
        assets: AssetStore,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new());
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            detector,
            assets,
            metrics,
        };

        let router =
            build_router(app_state, config.assets.max_upload_bytes).layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
