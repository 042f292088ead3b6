use serde::{Deserialize, Serialize};

/// 发票版式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    #[default]
    Modern,
    Classic,
    Minimal,
}

impl TemplateVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateVariant::Modern => "modern",
            TemplateVariant::Classic => "classic",
            TemplateVariant::Minimal => "minimal",
        }
    }
}

/// 公司及版式配置 (前端字段为 camelCase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceTemplate {
    #[serde(alias = "company_name", alias = "companyname")]
    pub company_name: String,
    #[serde(alias = "company_address", alias = "companyaddress")]
    pub company_address: String,
    #[serde(alias = "company_email", alias = "companyemail")]
    pub company_email: String,
    #[serde(alias = "company_phone", alias = "companyphone")]
    pub company_phone: String,
    /// 图片 URL 或 data URI
    pub logo: String,
    pub template: TemplateVariant,
    pub terms: Option<String>,
    pub signature: Option<String>,
    pub details: Option<String>,
}

impl Default for InvoiceTemplate {
    fn default() -> Self {
        Self {
            company_name: "Your Company".to_string(),
            company_address: String::new(),
            company_email: String::new(),
            company_phone: String::new(),
            logo: String::new(),
            template: TemplateVariant::Modern,
            terms: None,
            signature: None,
            details: None,
        }
    }
}
