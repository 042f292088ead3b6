pub mod handlers;

pub use handlers::*;

use crate::service::InvoicePipeline;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// 构建路由; 每个接口同时挂在根路径和 /api 下
pub fn router(pipeline: Arc<InvoicePipeline>, upload_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/upload-excel", post(upload_excel))
        .route("/api/upload-excel", post(upload_excel))
        .route("/send-invoices", post(send_invoices))
        .route("/api/send-invoices", post(send_invoices))
        .layer(DefaultBodyLimit::max(upload_limit_bytes))
        .with_state(pipeline)
}
