use crate::error::{ValidationFailure, ValidationReason};
use crate::models::{InvoiceRecord, RawRow};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// 规范字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Id,
    Date,
    Name,
    Email,
    Phone,
    Description,
    Amount,
    Tax,
    Total,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Date => "date",
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Description => "description",
            Field::Amount => "amount",
            Field::Tax => "tax",
            Field::Total => "total",
        }
    }
}

/// 规范字段 -> 可接受的表头写法 (按优先级排列，大小写不敏感)
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<(Field, Vec<String>)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let table: [(Field, &[&str]); 9] = [
            (Field::Id, &["id", "invoice id", "invoice_id", "invoice no"]),
            (Field::Date, &["date", "invoice date"]),
            (Field::Name, &["name", "customer", "customer name", "client"]),
            (Field::Email, &["email", "e-mail", "email address", "mail"]),
            (Field::Phone, &["phone", "phone number", "mobile", "contact"]),
            (Field::Description, &["description", "details", "item"]),
            (Field::Amount, &["amount", "subtotal", "price"]),
            (Field::Tax, &["tax", "vat", "gst"]),
            (Field::Total, &["total", "grand total"]),
        ];

        Self {
            entries: table
                .iter()
                .map(|(field, aliases)| (*field, aliases.iter().map(|a| a.to_string()).collect()))
                .collect(),
        }
    }
}

impl AliasTable {
    /// 追加一个表头写法，优先级最低
    pub fn with_alias(mut self, field: Field, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, aliases)) => aliases.push(alias),
            None => self.entries.push((field, vec![alias])),
        }
        self
    }

    /// 追加配置中的额外写法
    pub fn with_overrides(self, overrides: &BTreeMap<Field, Vec<String>>) -> Self {
        overrides.iter().fold(self, |table, (field, aliases)| {
            aliases
                .iter()
                .fold(table, |table, alias| table.with_alias(*field, alias.as_str()))
        })
    }

    pub fn aliases(&self, field: Field) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// 按别名优先级查找，第一个命中且非 null 的值生效
    pub fn lookup<'a>(&self, row: &'a RawRow, field: Field) -> Option<&'a Value> {
        self.aliases(field).iter().find_map(|alias| {
            row.iter()
                .find(|(key, value)| key.trim().eq_ignore_ascii_case(alias) && !value.is_null())
                .map(|(_, value)| value)
        })
    }
}

/// 行规范化: 原始表格行 -> InvoiceRecord
///
/// 纯函数，除构造时取一次批次标记和当天日期外不依赖外部状态
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    aliases: AliasTable,
    trust_supplied_total: bool,
    batch_tag: String,
    today: String,
}

impl RowNormalizer {
    pub fn new(trust_supplied_total: bool) -> Self {
        Self {
            aliases: AliasTable::default(),
            trust_supplied_total,
            batch_tag: chrono::Utc::now().timestamp_millis().to_string(),
            today: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_batch_tag(mut self, tag: impl Into<String>) -> Self {
        self.batch_tag = tag.into();
        self
    }

    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.today = today.into();
        self
    }

    /// `row_index` 从 1 开始
    pub fn normalize(&self, raw: &RawRow, row_index: usize) -> Result<InvoiceRecord, ValidationFailure> {
        let id = self
            .text(raw, Field::Id)
            .unwrap_or_else(|| format!("inv-{}-{}", self.batch_tag, row_index.saturating_sub(1)));

        let fail = |reason: ValidationReason| ValidationFailure {
            row: row_index,
            id: id.clone(),
            reason,
        };

        let name = self
            .text(raw, Field::Name)
            .ok_or_else(|| fail(ValidationReason::MissingField(Field::Name.name())))?;
        let email = self
            .text(raw, Field::Email)
            .ok_or_else(|| fail(ValidationReason::MissingField(Field::Email.name())))?;
        let amount = self
            .decimal(raw, Field::Amount)
            .ok_or_else(|| fail(ValidationReason::MissingField(Field::Amount.name())))?;
        if amount < BigDecimal::zero() {
            return Err(fail(ValidationReason::InvalidField(Field::Amount.name())));
        }

        let tax = self.decimal(raw, Field::Tax).unwrap_or_else(BigDecimal::zero);
        if tax < BigDecimal::zero() {
            return Err(fail(ValidationReason::InvalidField(Field::Tax.name())));
        }

        let supplied_total = if self.trust_supplied_total {
            self.decimal(raw, Field::Total)
        } else {
            None
        };
        let total = supplied_total.unwrap_or_else(|| &amount + &tax);
        if total < BigDecimal::zero() {
            return Err(fail(ValidationReason::InvalidField(Field::Total.name())));
        }

        Ok(InvoiceRecord {
            date: self.text(raw, Field::Date).unwrap_or_else(|| self.today.clone()),
            phone: self.text(raw, Field::Phone).unwrap_or_default(),
            description: self.text(raw, Field::Description).unwrap_or_default(),
            id,
            name,
            email,
            amount,
            tax,
            total,
        })
    }

    /// 逐行规范化，结果与输入一一对应
    pub fn normalize_all(&self, rows: &[RawRow]) -> Vec<Result<InvoiceRecord, ValidationFailure>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.normalize(row, i + 1))
            .collect()
    }

    fn text(&self, raw: &RawRow, field: Field) -> Option<String> {
        self.aliases.lookup(raw, field).and_then(coerce_text)
    }

    fn decimal(&self, raw: &RawRow, field: Field) -> Option<BigDecimal> {
        self.aliases.lookup(raw, field).and_then(coerce_decimal)
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn coerce_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches(['$', '€', '£', '₹'])
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                BigDecimal::from_str(&cleaned).ok()
            }
        }
        _ => None,
    }
}
