use crate::ingest::Field;
use crate::models::{Channel, InvoiceTemplate};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// 应用配置
///
/// 加载顺序: 内置默认值 -> invoicer.toml (可选) -> INVOICER__* 环境变量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    /// 请求未携带模板时使用的公司信息
    pub company: InvoiceTemplate,
    pub smtp: Option<SmtpConfig>,
    pub twilio: Option<TwilioConfig>,
    pub renderer: RendererConfig,
    pub messages: MessageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

/// 单行内多渠道失败时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolicy {
    /// 首个渠道失败即放弃该行剩余渠道
    #[default]
    FailFast,
    /// 每个渠道都尝试，任一失败则该行失败
    Independent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// true: 保留表格中提供的 total; false: 始终按 amount + tax 重新计算
    pub trust_supplied_total: bool,
    pub channel_policy: ChannelPolicy,
    pub default_channels: Vec<Channel>,
    /// 同时处理的行数，结果顺序不受影响
    pub max_concurrency: usize,
    pub send_timeout_secs: u64,
    pub retry: RetryConfig,
    /// 额外的表头写法，追加在内置别名之后
    pub field_aliases: BTreeMap<Field, Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trust_supplied_total: true,
            channel_policy: ChannelPolicy::FailFast,
            default_channels: vec![Channel::Email],
            max_concurrency: 1,
            send_timeout_secs: 30,
            retry: RetryConfig::default(),
            field_aliases: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 500,
        }
    }
}

impl RetryConfig {
    /// 第 attempt 次重试前的等待时间 (指数退避)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// 日志中不输出明文的字符串
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Secret,
    /// 发件人，例如 "Billing <billing@example.com>"
    pub from: String,
    /// false 时使用隐式 TLS (465)
    #[serde(default = "default_true")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: Secret,
    #[serde(default)]
    pub sms_from: Option<String>,
    #[serde(default)]
    pub whatsapp_from: Option<String>,
    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
}

fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// HTML -> PDF 转换命令，未设置时以 HTML 附件发送
    pub pdf_command: Option<String>,
    pub pdf_args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            pdf_command: None,
            pdf_args: vec!["--quiet".to_string(), "-".to_string(), "-".to_string()],
            timeout_secs: 30,
        }
    }
}

/// 文本消息模板 (handlebars 语法)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub email_subject: String,
    pub email_body: String,
    pub sms: String,
    pub whatsapp: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            email_subject: "Invoice {{invoice.id}} from {{company.companyName}}".to_string(),
            email_body: "Dear {{invoice.name}},\n\nPlease find attached your invoice {{invoice.id}} dated {{invoice.date}} for a total of {{invoice.total}}.\n\nRegards,\n{{company.companyName}}".to_string(),
            sms: "Your invoice has been sent to your email.".to_string(),
            whatsapp: "Hello! Your invoice has been emailed.".to_string(),
        }
    }
}

impl AppConfig {
    /// 加载配置; `path` 为空时读取 INVOICER_CONFIG 指定的文件或 ./invoicer.toml (均可缺省)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => {
                let name = std::env::var("INVOICER_CONFIG").unwrap_or_else(|_| "invoicer".to_string());
                File::with_name(&name).required(false)
            }
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("INVOICER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pipeline.default_channels")
                    .with_list_parse_key("renderer.pdf_args"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_email_only_and_fail_fast() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.default_channels, vec![Channel::Email]);
        assert_eq!(config.pipeline.channel_policy, ChannelPolicy::FailFast);
        assert!(config.pipeline.trust_supplied_total);
        assert!(config.smtp.is_none());
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[pipeline]
trust_supplied_total = false
channel_policy = "independent"
default_channels = ["email", "sms"]

[pipeline.field_aliases]
email = ["correo"]

[smtp]
host = "smtp.example.com"
from = "Billing <billing@example.com>"
password = "hunter2"

[company]
companyName = "Acme"
template = "classic"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(!config.pipeline.trust_supplied_total);
        assert_eq!(config.pipeline.channel_policy, ChannelPolicy::Independent);
        assert_eq!(config.pipeline.default_channels, vec![Channel::Email, Channel::Sms]);
        assert_eq!(config.company.company_name, "Acme");
        assert_eq!(config.pipeline.field_aliases[&Field::Email], vec!["correo".to_string()]);

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.password.expose(), "hunter2");
        assert_eq!(format!("{:?}", smtp.password), "\"***\"");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryConfig { max_retries: 3, backoff_ms: 100 };
        assert_eq!(retry.backoff(0), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(400));
    }
}
