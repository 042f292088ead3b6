use super::{DocumentRenderer, RenderedDocument};
use crate::error::RenderError;
use crate::models::{InvoiceRecord, InvoiceTemplate, TemplateVariant};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use bytes::Bytes;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::{json, Value};
use std::str::FromStr;

const MODERN: &str = include_str!("../../templates/invoice_modern.hbs");
const CLASSIC: &str = include_str!("../../templates/invoice_classic.hbs");
const MINIMAL: &str = include_str!("../../templates/invoice_minimal.hbs");

/// 金额保留两位小数；无法解析时原样输出
pub(crate) fn format_money(value: &Value) -> String {
    let parsed = match value {
        Value::String(s) => BigDecimal::from_str(s).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    match parsed {
        Some(d) => d.round(2).with_scale(2).to_string(),
        None => value.as_str().map(str::to_string).unwrap_or_default(),
    }
}

handlebars_helper!(money: |v: Json| format_money(v));

/// 模板上下文: invoice + company
pub(crate) fn template_context(record: &InvoiceRecord, template: &InvoiceTemplate) -> Value {
    json!({
        "invoice": record,
        "company": template,
    })
}

/// 使用内置 handlebars 模板生成 HTML 发票
pub struct HtmlInvoiceRenderer {
    registry: Handlebars<'static>,
}

impl HtmlInvoiceRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.register_helper("money", Box::new(money));
        registry.register_template_string(TemplateVariant::Modern.as_str(), MODERN)?;
        registry.register_template_string(TemplateVariant::Classic.as_str(), CLASSIC)?;
        registry.register_template_string(TemplateVariant::Minimal.as_str(), MINIMAL)?;
        Ok(Self { registry })
    }

    pub fn render_html(
        &self,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<String, RenderError> {
        let html = self
            .registry
            .render(template.template.as_str(), &template_context(record, template))?;
        Ok(html)
    }
}

#[async_trait]
impl DocumentRenderer for HtmlInvoiceRenderer {
    async fn render(
        &self,
        record: &InvoiceRecord,
        template: &InvoiceTemplate,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.render_html(record, template)?;
        Ok(RenderedDocument {
            file_name: format!("invoice-{}.html", record.id),
            content_type: "text/html; charset=utf-8".to_string(),
            bytes: Bytes::from(html),
        })
    }
}
