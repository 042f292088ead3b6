use crate::config::AppConfig;
use crate::delivery::ChannelSenders;
use crate::error::StartupError;
use crate::ingest::{AliasTable, RowNormalizer};
use crate::models::{BatchSummary, ChannelSet, InvoiceTemplate, RawRow};
use crate::render::{DocumentRenderer, HtmlInvoiceRenderer, MessageRenderer, PdfInvoiceRenderer};
use crate::service::{BatchDispatcher, DispatchOptions};
use std::sync::Arc;

/// 原始行 -> 规范化 -> 调度 的完整流程，HTTP 与 CLI 共用
pub struct InvoicePipeline {
    dispatcher: BatchDispatcher,
    trust_supplied_total: bool,
    aliases: AliasTable,
    default_template: InvoiceTemplate,
    default_channels: ChannelSet,
}

impl InvoicePipeline {
    pub fn new(
        dispatcher: BatchDispatcher,
        trust_supplied_total: bool,
        default_template: InvoiceTemplate,
        default_channels: ChannelSet,
    ) -> Self {
        Self {
            dispatcher,
            trust_supplied_total,
            aliases: AliasTable::default(),
            default_template,
            default_channels,
        }
    }

    /// 按配置装配渲染器与各渠道发送器，需在 tokio 运行时内调用
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let default_channels: ChannelSet = config.pipeline.default_channels.iter().copied().collect();
        if default_channels.is_empty() {
            return Err(StartupError::NoDefaultChannels);
        }

        let renderer: Arc<dyn DocumentRenderer> = match PdfInvoiceRenderer::from_config(&config.renderer)? {
            Some(pdf) => {
                tracing::info!("PDF renderer enabled: {:?}", config.renderer.pdf_command);
                Arc::new(pdf)
            }
            None => {
                tracing::warn!("renderer.pdf_command not set, invoices will be attached as HTML");
                Arc::new(HtmlInvoiceRenderer::new()?)
            }
        };
        let messages = Arc::new(MessageRenderer::new(&config.messages)?);
        let senders = ChannelSenders::from_config(config)?;
        tracing::info!("Configured channels: {:?}", Vec::from(senders.configured()));

        let dispatcher = BatchDispatcher::new(
            renderer,
            messages,
            senders,
            DispatchOptions::from(&config.pipeline),
        );

        Ok(Self::new(
            dispatcher,
            config.pipeline.trust_supplied_total,
            config.company.clone(),
            default_channels,
        )
        .with_aliases(AliasTable::default().with_overrides(&config.pipeline.field_aliases)))
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn configured_channels(&self) -> ChannelSet {
        self.dispatcher.senders().configured()
    }

    pub fn default_channels(&self) -> ChannelSet {
        self.default_channels
    }

    /// 每批使用新的 normalizer，生成的 id 带本批次时间戳
    pub fn normalizer(&self) -> RowNormalizer {
        RowNormalizer::new(self.trust_supplied_total).with_aliases(self.aliases.clone())
    }

    pub async fn run(
        &self,
        rows: &[RawRow],
        template: Option<&InvoiceTemplate>,
        channels: Option<ChannelSet>,
    ) -> BatchSummary {
        let normalized = self.normalizer().normalize_all(rows);
        let template = template.unwrap_or(&self.default_template);
        let channels = channels.unwrap_or(self.default_channels);

        self.dispatcher.dispatch(normalized, template, channels).await
    }
}
