mod ort_detector;
mod pages;
mod routes;

pub mod app;
pub mod config;
pub mod detector;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use app::start_app;
