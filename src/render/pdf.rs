use super::{DocumentRenderer, HtmlInvoiceRenderer, RenderedDocument};
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::models::{InvoiceRecord, InvoiceTemplate};
use async_trait::async_trait;
use bytes::Bytes;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// HTML 通过外部转换命令 (如 `wkhtmltopdf - -`) 生成 PDF
///
/// 命令从 stdin 读取 HTML，向 stdout 输出 PDF
pub struct PdfInvoiceRenderer {
    html: HtmlInvoiceRenderer,
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PdfInvoiceRenderer {
    pub fn new(
        html: HtmlInvoiceRenderer,
        command: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            html,
            command: command.into(),
            args,
            timeout,
        }
    }

    /// 未配置 pdf_command 时返回 None
    pub fn from_config(config: &RendererConfig) -> Result<Option<Self>, RenderError> {
        let Some(command) = &config.pdf_command else {
            return Ok(None);
        };
        Ok(Some(Self::new(
            HtmlInvoiceRenderer::new()?,
            command.clone(),
            config.pdf_args.clone(),
            Duration::from_secs(config.timeout_secs),
        )))
    }

    async fn convert(&self, html: String) -> Result<Vec<u8>, RenderError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Converter("converter stdin unavailable".to_string()))?;

        // 边写边读，避免管道缓冲区写满导致互相等待
        let feed = async move {
            stdin.write_all(html.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Converter(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        // 转换器可能在读完 stdin 前就退出
        if let Err(e) = fed {
            tracing::debug!("converter closed stdin early: {}", e);
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Converter(format!("{} produced no output", self.command)));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl DocumentRenderer for PdfInvoiceRenderer {
    async fn render(
        &self,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.html.render_html(record, template)?;
        let pdf = tokio::time::timeout(self.timeout, self.convert(html))
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        Ok(RenderedDocument {
            file_name: format!("invoice-{}.pdf", record.id),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from(pdf),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::render::html::tests::sample_record;

    fn renderer(command: &str, args: &[&str], timeout: Duration) -> PdfInvoiceRenderer {
        PdfInvoiceRenderer::new(
            HtmlInvoiceRenderer::new().unwrap(),
            command,
            args.iter().map(|a| a.to_string()).collect(),
            timeout,
        )
    }

    #[tokio::test]
    async fn pipes_html_through_converter() {
        // cat 原样回显，足以验证管道
        let doc = renderer("cat", &[], Duration::from_secs(5))
            .render(&sample_record(), &InvoiceTemplate::default())
            .await
            .unwrap();
        assert_eq!(doc.file_name, "invoice-INV-7.pdf");
        assert_eq!(doc.content_type, "application/pdf");
        assert!(String::from_utf8_lossy(&doc.bytes).contains("INV-7"));
    }

    #[tokio::test]
    async fn failing_converter_is_a_render_error() {
        let err = renderer("false", &[], Duration::from_secs(5))
            .render(&sample_record(), &InvoiceTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Converter(_)));
    }

    #[tokio::test]
    async fn missing_converter_is_an_io_error() {
        let err = renderer("/nonexistent/wkhtmltopdf", &[], Duration::from_secs(5))
            .render(&sample_record(), &InvoiceTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[tokio::test]
    async fn slow_converter_times_out() {
        let err = renderer("sleep", &["5"], Duration::from_millis(100))
            .render(&sample_record(), &InvoiceTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));
    }

    #[test]
    fn not_configured_means_no_pdf_renderer() {
        assert!(PdfInvoiceRenderer::from_config(&RendererConfig::default())
            .unwrap()
            .is_none());
    }
}
