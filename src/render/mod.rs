pub mod html;
pub mod message;
pub mod pdf;

pub use html::HtmlInvoiceRenderer;
pub use message::MessageRenderer;
pub use pdf::PdfInvoiceRenderer;

use crate::error::RenderError;
use crate::models::{InvoiceRecord, InvoiceTemplate};
use async_trait::async_trait;
use bytes::Bytes;

/// 渲染结果，作为邮件附件发送
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// 发票文档渲染器
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<RenderedDocument, RenderError>;
}
