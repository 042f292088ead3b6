use crate::config::{ChannelPolicy, PipelineConfig, RetryConfig};
use crate::delivery::{ChannelSenders, Payload};
use crate::error::{ChannelError, DeliveryError, ValidationFailure};
use crate::models::{
    BatchOutcome, BatchSummary, Channel, ChannelDelivery, ChannelSet, InvoiceRecord,
    InvoiceTemplate, OutcomeStatus,
};
use crate::render::{DocumentRenderer, MessageRenderer, RenderedDocument};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const NO_CHANNEL: &str = "no delivery channel enabled";

/// 规范化后的行: 有效记录或校验失败
pub type NormalizedRow = Result<InvoiceRecord, ValidationFailure>;

/// 调度参数
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub policy: ChannelPolicy,
    pub send_timeout: Duration,
    pub retry: RetryConfig,
    /// 同时在途的行数; 1 即严格顺序处理
    pub max_concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for DispatchOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            policy: config.channel_policy,
            send_timeout: config.send_timeout(),
            retry: config.retry.clone(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }
}

/// 批量调度: 逐行渲染并按 Email -> Sms -> WhatsApp 顺序投递
///
/// 单行失败只影响该行; 结果顺序与输入顺序一致
pub struct BatchDispatcher {
    renderer: Arc<dyn DocumentRenderer>,
    messages: Arc<MessageRenderer>,
    senders: ChannelSenders,
    options: DispatchOptions,
}

impl BatchDispatcher {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        messages: Arc<MessageRenderer>,
        senders: ChannelSenders,
        options: DispatchOptions,
    ) -> Self {
        Self {
            renderer,
            messages,
            senders,
            options,
        }
    }

    pub fn senders(&self) -> &ChannelSenders {
        &self.senders
    }

    /// 批量处理入口，每个输入行恰好产生一个结果
    pub async fn dispatch(
        &self,
        rows: Vec<NormalizedRow>,
        template: &InvoiceTemplate,
        channels: ChannelSet,
    ) -> BatchSummary {
        let total = rows.len();
        info!(
            "Dispatching {} invoices via {:?} (policy {:?}, concurrency {})",
            total,
            Vec::from(channels),
            self.options.policy,
            self.options.max_concurrency
        );

        let mut summary = BatchSummary::with_capacity(total);
        // buffered 保持输入顺序输出
        let mut outcomes = stream::iter(rows)
            .map(|row| self.process_row(row, template, channels))
            .buffered(self.options.max_concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            summary.push(outcome);

            let done = summary.total();
            if done % 100 == 0 && done < total {
                info!(
                    "进度: {}/{}, 成功: {}, 失败: {}",
                    done, total, summary.sent_count, summary.failed_count
                );
            }
        }

        info!(
            "Batch finished: {} invoices, sent {}, failed {}",
            total, summary.sent_count, summary.failed_count
        );
        summary
    }

    /// 已校验记录的便捷入口
    pub async fn dispatch_records(
        &self,
        records: Vec<InvoiceRecord>,
        template: &InvoiceTemplate,
        channels: ChannelSet,
    ) -> BatchSummary {
        self.dispatch(records.into_iter().map(Ok).collect(), template, channels)
            .await
    }

    async fn process_row(
        &self,
        row: NormalizedRow,
        template: &InvoiceTemplate,
        channels: ChannelSet,
    ) -> BatchOutcome {
        let record = match row {
            Ok(record) => record,
            Err(failure) => {
                warn!("Row {} ({}) skipped: {}", failure.row, failure.id, failure.reason);
                return BatchOutcome::failed(failure.id, failure.reason.to_string());
            }
        };

        if channels.is_empty() {
            warn!("Invoice {} has no delivery channel", record.id);
            return BatchOutcome::failed(record.id, NO_CHANNEL.to_string());
        }

        let document = match self.renderer.render(&record, template).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Invoice {} render failed: {}", record.id, e);
                return BatchOutcome::failed(record.id, e.to_string());
            }
        };

        let mut deliveries = Vec::new();
        let mut errors: Vec<(Channel, String)> = Vec::new();

        for channel in channels.iter() {
            match self.deliver(channel, &record, template, &document).await {
                Ok(()) => deliveries.push(ChannelDelivery {
                    channel,
                    status: OutcomeStatus::Sent,
                    error: None,
                }),
                Err(e) => {
                    let message = e.to_string();
                    warn!("Invoice {} {} delivery failed: {}", record.id, channel, message);
                    deliveries.push(ChannelDelivery {
                        channel,
                        status: OutcomeStatus::Failed,
                        error: Some(message.clone()),
                    });
                    errors.push((channel, message));

                    if self.options.policy == ChannelPolicy::FailFast {
                        break;
                    }
                }
            }
        }

        if errors.is_empty() {
            return BatchOutcome::sent(record.id, deliveries);
        }

        let error = match self.options.policy {
            ChannelPolicy::FailFast => errors.swap_remove(0).1,
            ChannelPolicy::Independent => errors
                .iter()
                .map(|(channel, message)| format!("{}: {}", channel, message))
                .collect::<Vec<_>>()
                .join("; "),
        };

        BatchOutcome {
            id: record.id,
            status: OutcomeStatus::Failed,
            error: Some(error),
            channels: deliveries,
        }
    }

    async fn deliver(
        &self,
        channel: Channel,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
        document: &RenderedDocument,
    ) -> Result<(), ChannelError> {
        let sender = self
            .senders
            .get(channel)
            .ok_or(DeliveryError::NotConfigured(channel))?;

        let recipient = record.contact_for(channel).trim();
        if recipient.is_empty() {
            return Err(DeliveryError::MissingContact(channel).into());
        }

        let payload = match channel {
            Channel::Email => {
                let (subject, body) = self.messages.email(record, template)?;
                Payload::Document {
                    subject,
                    body,
                    document: document.clone(),
                }
            }
            Channel::Sms | Channel::WhatsApp => {
                Payload::Text(self.messages.text(channel, record, template)?)
            }
        };

        let timeout = self.options.send_timeout;
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(timeout, sender.send(recipient, &payload)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout { channel, timeout }),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.options.retry.max_retries && e.is_retryable() => {
                    let wait = self.options.retry.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Invoice {} {} attempt {} failed: {}, retrying in {:?}",
                        record.id, channel, attempt, e, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
