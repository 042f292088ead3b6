use crate::models::Channel;
use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 原始表格行 (表头 -> 单元格值)，保持表头顺序
pub type RawRow = IndexMap<String, serde_json::Value>;

/// 规范化后的发票记录
///
/// 由 `RowNormalizer` 构造后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    pub date: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
    pub amount: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

impl InvoiceRecord {
    /// 按渠道取联系人字段
    pub fn contact_for(&self, channel: Channel) -> &str {
        match channel {
            Channel::Email => &self.email,
            Channel::Sms | Channel::WhatsApp => &self.phone,
        }
    }
}
