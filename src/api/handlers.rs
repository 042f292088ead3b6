use crate::error::{ApiError, IngestError};
use crate::ingest::{assign_ids, read_upload};
use crate::models::{Channel, ChannelSet, InvoiceTemplate, RawRow};
use crate::service::reporter::{counts, report, SendInvoicesResponse};
use crate::service::InvoicePipeline;
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Json, Multipart, Query, State,
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 上传响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub invoices: Vec<RawRow>,
}

/// 请求体: 发票行 (原始或规范字段均可) + 可选模板与渠道
#[derive(Debug, Deserialize)]
pub struct SendInvoicesRequest {
    pub invoices: Vec<RawRow>,
    #[serde(default)]
    pub template: Option<InvoiceTemplate>,
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
}

/// 响应形态: full 含逐行结果，counts 仅计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportShape {
    #[default]
    Full,
    Counts,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendQuery {
    #[serde(default)]
    pub shape: ReportShape,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 上传表格 (multipart 字段 `file`)，返回带 id 的原始行
pub async fn upload_excel(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e.body_text())))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e.body_text())))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    };
    tracing::info!("Upload received: {} ({} bytes)", file_name, bytes.len());

    // 解析为阻塞 IO，放到阻塞线程池
    let parsed = tokio::task::spawn_blocking(move || read_upload(&file_name, &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Parser task failed: {}", e)))?;

    let rows = match parsed {
        Ok(rows) => rows,
        Err(IngestError::Empty) => {
            return Err(ApiError::BadRequest("Excel is empty or invalid".to_string()))
        }
        Err(e @ IngestError::UnsupportedFormat(_)) => return Err(ApiError::BadRequest(e.to_string())),
        Err(e) => {
            tracing::error!("Parsing error: {}", e);
            return Err(ApiError::Internal("Server error parsing Excel".to_string()));
        }
    };

    let invoices = assign_ids(rows, chrono::Utc::now().timestamp_millis());
    Ok(Json(UploadResponse {
        success: true,
        message: "Excel file parsed successfully".to_string(),
        invoices,
    }))
}

/// 批量发送发票
pub async fn send_invoices(
    State(pipeline): State<Arc<InvoicePipeline>>,
    query: Result<Query<SendQuery>, QueryRejection>,
    payload: Result<Json<SendInvoicesRequest>, JsonRejection>,
) -> Result<Json<SendInvoicesResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e.body_text())))?;
    let Json(req) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let channels: ChannelSet = match req.channels {
        Some(list) if list.is_empty() => {
            return Err(ApiError::BadRequest("No delivery channel selected".to_string()))
        }
        Some(list) => list.into_iter().collect(),
        None => pipeline.default_channels(),
    };

    let configured = pipeline.configured_channels();
    let unavailable: Vec<&str> = channels
        .iter()
        .filter(|c| !configured.contains(*c))
        .map(|c| c.as_str())
        .collect();
    if !unavailable.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Channel not configured: {}",
            unavailable.join(", ")
        )));
    }

    tracing::info!(
        "Sending {} invoices via {:?}",
        req.invoices.len(),
        Vec::from(channels)
    );
    let summary = pipeline
        .run(&req.invoices, req.template.as_ref(), Some(channels))
        .await;

    let response = match query.shape {
        ReportShape::Full => report(summary),
        ReportShape::Counts => counts(&summary),
    };
    Ok(Json(response))
}
