use super::html::template_context;
use crate::config::MessageConfig;
use crate::error::RenderError;
use crate::models::{Channel, InvoiceRecord, InvoiceTemplate};
use handlebars::Handlebars;

const EMAIL_SUBJECT: &str = "email_subject";
const EMAIL_BODY: &str = "email_body";

/// 邮件标题/正文及短信、WhatsApp 文本
pub struct MessageRenderer {
    registry: Handlebars<'static>,
}

impl MessageRenderer {
    pub fn new(messages: &MessageConfig) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        // 纯文本，不做 HTML 转义
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(EMAIL_SUBJECT, &messages.email_subject)?;
        registry.register_template_string(EMAIL_BODY, &messages.email_body)?;
        registry.register_template_string(Channel::Sms.as_str(), &messages.sms)?;
        registry.register_template_string(Channel::WhatsApp.as_str(), &messages.whatsapp)?;
        Ok(Self { registry })
    }

    /// 返回 (subject, body)
    pub fn email(
        &self,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<(String, String), RenderError> {
        let ctx = template_context(record, template);
        let subject = self.registry.render(EMAIL_SUBJECT, &ctx)?;
        let body = self.registry.render(EMAIL_BODY, &ctx)?;
        Ok((subject, body))
    }

    /// 短信 / WhatsApp 文本
    pub fn text(
        &self,
        channel: Channel,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<String, RenderError> {
        let name = match channel {
            Channel::Email => EMAIL_BODY,
            other => other.as_str(),
        };
        Ok(self.registry.render(name, &template_context(record, template))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::html::tests::sample_record;

    #[test]
    fn default_messages() {
        let renderer = MessageRenderer::new(&MessageConfig::default()).unwrap();
        let template = InvoiceTemplate {
            company_name: "Acme".into(),
            ..InvoiceTemplate::default()
        };
        let record = sample_record();

        let (subject, body) = renderer.email(&record, &template).unwrap();
        assert_eq!(subject, "Invoice INV-7 from Acme");
        assert!(body.starts_with("Dear John <Doe>,"));

        assert_eq!(
            renderer.text(Channel::Sms, &record, &template).unwrap(),
            "Your invoice has been sent to your email."
        );
        assert_eq!(
            renderer.text(Channel::WhatsApp, &record, &template).unwrap(),
            "Hello! Your invoice has been emailed."
        );
    }

    #[test]
    fn custom_sms_template_sees_invoice_fields() {
        let messages = MessageConfig {
            sms: "Hi {{invoice.name}}, invoice {{invoice.id}} total {{invoice.total}}".into(),
            ..MessageConfig::default()
        };
        let renderer = MessageRenderer::new(&messages).unwrap();
        let text = renderer
            .text(Channel::Sms, &sample_record(), &InvoiceTemplate::default())
            .unwrap();
        assert_eq!(text, "Hi John <Doe>, invoice INV-7 total 1100.5");
    }

    #[test]
    fn malformed_template_fails_at_construction() {
        let messages = MessageConfig {
            whatsapp: "Hello {{#if}}".into(),
            ..MessageConfig::default()
        };
        assert!(matches!(MessageRenderer::new(&messages), Err(RenderError::Syntax(_))));
    }
}
