use crate::models::Channel;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// 整个请求级别的输入错误 (表格不可读/为空/格式不支持)
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),
    #[error("spreadsheet is empty or invalid")]
    Empty,
    #[error("failed to read spreadsheet: {0}")]
    Unreadable(String),
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Unreadable(e.to_string())
    }
}

impl From<calamine::Error> for IngestError {
    fn from(e: calamine::Error) -> Self {
        IngestError::Unreadable(e.to_string())
    }
}

/// 行级校验失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// 行级校验失败，该行记为 Failed，批次继续
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}: {reason}")]
pub struct ValidationFailure {
    /// 从 1 开始的行号
    pub row: usize,
    pub id: String,
    pub reason: ValidationReason,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template syntax error: {0}")]
    Syntax(#[from] handlebars::TemplateError),
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
    #[error("pdf converter failed: {0}")]
    Converter(String),
    #[error("pdf converter timed out after {0:?}")]
    Timeout(Duration),
    #[error("pdf converter io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0} channel is not configured")]
    NotConfigured(Channel),
    #[error("missing {} for {}", .0.contact_field(), .0)]
    MissingContact(Channel),
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("{channel} send timed out after {timeout:?}")]
    Timeout { channel: Channel, timeout: Duration },
}

impl DeliveryError {
    /// 是否值得重试 (配置/数据问题重试无意义)
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::NotConfigured(_)
            | DeliveryError::MissingContact(_)
            | DeliveryError::InvalidAddress { .. } => false,
            DeliveryError::Rejected { status, .. } => *status >= 500 || *status == 429,
            DeliveryError::Transport(_) | DeliveryError::Timeout { .. } => true,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        DeliveryError::Transport(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for DeliveryError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        DeliveryError::Transport(e.to_string())
    }
}

/// 单个渠道的失败: 消息渲染失败或投递失败
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// 启动阶段错误
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("renderer setup failed: {0}")]
    Render(#[from] RenderError),
    #[error("sender setup failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("pipeline.default_channels must name at least one channel")]
    NoDefaultChannels,
}

/// HTTP 层错误，响应体为 `{ success: false, message }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
