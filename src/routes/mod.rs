mod health;
mod index;
mod metrics;
mod technical;

use crate::server::SharedState;
use axum::{routing::get, Router};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index::upload_form).post(index::handle_upload))
        .route("/technical", get(technical::technical_page))
        .route("/health_check", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
}
