#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use invoice_dispatch::config::MessageConfig;
use invoice_dispatch::delivery::{ChannelSender, ChannelSenders, Payload};
use invoice_dispatch::error::{DeliveryError, RenderError};
use invoice_dispatch::models::{ChannelSet, InvoiceRecord, InvoiceTemplate};
use invoice_dispatch::render::{DocumentRenderer, MessageRenderer, RenderedDocument};
use invoice_dispatch::service::{BatchDispatcher, DispatchOptions, InvoicePipeline};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 总是成功的渲染器
pub struct StaticRenderer;

#[async_trait]
impl DocumentRenderer for StaticRenderer {
    async fn render(
        &self,
        record: &InvoiceRecord,
        _template: &InvoiceTemplate,
    ) -> Result<RenderedDocument, RenderError> {
        Ok(RenderedDocument {
            file_name: format!("invoice-{}.pdf", record.id),
            content_type: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        })
    }
}

/// 记录收件人，可在第 N 次调用 (从 1 开始) 时失败
#[derive(Default)]
pub struct ScriptedSender {
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
    recipients: Mutex<Vec<String>>,
}

impl ScriptedSender {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recipients(&self) -> Vec<String> {
        self.recipients.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    async fn send(&self, recipient: &str, _payload: &Payload) -> Result<(), DeliveryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.recipients.lock().unwrap().push(recipient.to_string());
        if self.fail_on_call == Some(call) {
            return Err(DeliveryError::Transport(format!("call {} refused", call)));
        }
        Ok(())
    }
}

pub fn dispatcher(senders: ChannelSenders) -> BatchDispatcher {
    let messages = Arc::new(MessageRenderer::new(&MessageConfig::default()).unwrap());
    BatchDispatcher::new(Arc::new(StaticRenderer), messages, senders, DispatchOptions::default())
}

pub fn pipeline(senders: ChannelSenders) -> InvoicePipeline {
    InvoicePipeline::new(
        dispatcher(senders),
        true,
        InvoiceTemplate::default(),
        ChannelSet::email_only(),
    )
}
