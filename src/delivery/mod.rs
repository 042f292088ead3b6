pub mod email;
pub mod twilio;

pub use email::SmtpEmailSender;
pub use twilio::TwilioSender;

use crate::config::AppConfig;
use crate::error::DeliveryError;
use crate::models::{Channel, ChannelSet};
use crate::render::RenderedDocument;
use async_trait::async_trait;
use std::sync::Arc;

/// 发送内容
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 带附件的邮件
    Document {
        subject: String,
        body: String,
        document: RenderedDocument,
    },
    /// 短信 / WhatsApp 文本
    Text(String),
}

impl Payload {
    pub fn text(&self) -> &str {
        match self {
            Payload::Document { body, .. } => body,
            Payload::Text(text) => text,
        }
    }
}

/// 单个渠道的发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, recipient: &str, payload: &Payload) -> Result<(), DeliveryError>;
}

/// 按渠道注入的发送器，未配置的渠道为 None
#[derive(Clone, Default)]
pub struct ChannelSenders {
    email: Option<Arc<dyn ChannelSender>>,
    sms: Option<Arc<dyn ChannelSender>>,
    whatsapp: Option<Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    pub fn with(mut self, channel: Channel, sender: Arc<dyn ChannelSender>) -> Self {
        match channel {
            Channel::Email => self.email = Some(sender),
            Channel::Sms => self.sms = Some(sender),
            Channel::WhatsApp => self.whatsapp = Some(sender),
        }
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelSender>> {
        match channel {
            Channel::Email => self.email.as_ref(),
            Channel::Sms => self.sms.as_ref(),
            Channel::WhatsApp => self.whatsapp.as_ref(),
        }
    }

    /// 已配置发送器的渠道
    pub fn configured(&self) -> ChannelSet {
        Channel::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some())
            .collect()
    }

    /// 根据 smtp / twilio 配置构造真实发送器
    pub fn from_config(config: &AppConfig) -> Result<Self, DeliveryError> {
        let mut senders = ChannelSenders::default();

        if let Some(smtp) = &config.smtp {
            senders = senders.with(Channel::Email, Arc::new(SmtpEmailSender::new(smtp)?));
        }

        if let Some(twilio) = &config.twilio {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| DeliveryError::Transport(e.to_string()))?;
            if let Some(sender) = TwilioSender::sms(client.clone(), twilio) {
                senders = senders.with(Channel::Sms, Arc::new(sender));
            }
            if let Some(sender) = TwilioSender::whatsapp(client, twilio) {
                senders = senders.with(Channel::WhatsApp, Arc::new(sender));
            }
        }

        Ok(senders)
    }
}

impl std::fmt::Debug for ChannelSenders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSenders")
            .field("configured", &self.configured())
            .finish()
    }
}
