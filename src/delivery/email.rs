use super::{ChannelSender, Payload};
use crate::config::SmtpConfig;
use crate::error::DeliveryError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP 邮件发送，发票作为附件
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// 连接池会 spawn 后台任务，必须在 tokio 运行时内构建
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&config.from)?;
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        };

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

/// 组装邮件; 文档载荷带附件，文本载荷为纯文本
pub fn build_message(from: &Mailbox, recipient: &str, payload: &Payload) -> Result<Message, DeliveryError> {
    let builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(recipient)?);

    let message = match payload {
        Payload::Document {
            subject,
            body,
            document,
        } => {
            let content_type = ContentType::parse(&document.content_type)
                .map_err(|e| DeliveryError::Transport(format!("bad attachment type: {}", e)))?;
            let attachment = Attachment::new(document.file_name.clone())
                .body(document.bytes.to_vec(), content_type);

            builder.subject(subject.as_str()).multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.clone()))
                    .singlepart(attachment),
            )
        }
        Payload::Text(text) => builder.subject("Invoice").body(text.clone()),
    };

    message.map_err(|e| DeliveryError::Transport(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| {
        DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })
}

#[async_trait]
impl ChannelSender for SmtpEmailSender {
    async fn send(&self, recipient: &str, payload: &Payload) -> Result<(), DeliveryError> {
        let message = build_message(&self.from, recipient, payload)?;
        self.transport.send(message).await?;
        tracing::debug!("Email delivered to {}", recipient);
        Ok(())
    }
}
