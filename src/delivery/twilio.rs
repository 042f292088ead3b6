use super::{ChannelSender, Payload};
use crate::config::{Secret, TwilioConfig};
use crate::error::DeliveryError;
use crate::models::Channel;
use async_trait::async_trait;
use serde::Deserialize;

/// Twilio 错误响应
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}

/// Twilio Messages API: 短信与 WhatsApp 共用，WhatsApp 需加 `whatsapp:` 前缀
pub struct TwilioSender {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: Secret,
    from: String,
    channel: Channel,
}

impl TwilioSender {
    /// 未配置 sms_from 时返回 None
    pub fn sms(client: reqwest::Client, config: &TwilioConfig) -> Option<Self> {
        let from = config.sms_from.clone()?;
        Some(Self::new(client, config, from, Channel::Sms))
    }

    /// 未配置 whatsapp_from 时返回 None
    pub fn whatsapp(client: reqwest::Client, config: &TwilioConfig) -> Option<Self> {
        let from = config.whatsapp_from.clone()?;
        Some(Self::new(client, config, from, Channel::WhatsApp))
    }

    fn new(client: reqwest::Client, config: &TwilioConfig, from: String, channel: Channel) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from,
            channel,
        }
    }

    fn address(&self, number: &str) -> String {
        let number = number.trim();
        match self.channel {
            Channel::WhatsApp if !number.starts_with("whatsapp:") => format!("whatsapp:{}", number),
            _ => number.to_string(),
        }
    }
}

#[async_trait]
impl ChannelSender for TwilioSender {
    async fn send(&self, recipient: &str, payload: &Payload) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let to = self.address(recipient);
        let from = self.address(&self.from);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose()))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", payload.text())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} delivered to {}", self.channel, to);
            return Ok(());
        }

        let message = response
            .json::<TwilioErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: Secret::new("token"),
            sms_from: Some("+15550000".into()),
            whatsapp_from: Some("+15559999".into()),
            base_url,
        }
    }

    #[tokio::test]
    async fn sms_posts_form_to_messages_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=%2B15551234"))
            .and(body_string_contains("From=%2B15550000"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
            .expect(1)
            .mount(&server)
            .await;

        let sender = TwilioSender::sms(reqwest::Client::new(), &config(server.uri())).unwrap();
        sender
            .send("+15551234", &Payload::Text("Your invoice has been sent to your email.".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn whatsapp_prefixes_both_numbers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("To=whatsapp%3A%2B15551234"))
            .and(body_string_contains("From=whatsapp%3A%2B15559999"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sender = TwilioSender::whatsapp(reqwest::Client::new(), &config(server.uri())).unwrap();
        sender
            .send("+15551234", &Payload::Text("Hello!".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn provider_rejection_carries_twilio_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 21211,
                "message": "The 'To' number is not a valid phone number.",
                "status": 400
            })))
            .mount(&server)
            .await;

        let sender = TwilioSender::sms(reqwest::Client::new(), &config(server.uri())).unwrap();
        let err = sender.send("123", &Payload::Text("hi".into())).await.unwrap_err();

        match err {
            DeliveryError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The 'To' number is not a valid phone number.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_without_body_uses_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sender = TwilioSender::sms(reqwest::Client::new(), &config(server.uri())).unwrap();
        let err = sender.send("+1555", &Payload::Text("hi".into())).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "provider rejected message (503): Service Unavailable");
    }
}
