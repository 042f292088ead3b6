pub mod api;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod models;
pub mod render;
pub mod service;

pub use config::AppConfig;
pub use service::{BatchDispatcher, InvoicePipeline};
