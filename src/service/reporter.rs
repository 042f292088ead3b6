use crate::models::{BatchOutcome, BatchSummary, OutcomeStatus};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// 对外响应体 `{ success, sent, failed, results? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendInvoicesResponse {
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<BatchOutcome>>,
}

/// 完整形态: 计数 + 逐行结果
pub fn report(summary: BatchSummary) -> SendInvoicesResponse {
    SendInvoicesResponse {
        success: true,
        sent: summary.sent_count,
        failed: summary.failed_count,
        results: Some(summary.outcomes),
    }
}

/// 旧版形态: 仅计数
pub fn counts(summary: &BatchSummary) -> SendInvoicesResponse {
    SendInvoicesResponse {
        success: true,
        sent: summary.sent_count,
        failed: summary.failed_count,
        results: None,
    }
}

fn status_str(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Sent => "Sent",
        OutcomeStatus::Failed => "Failed",
    }
}

/// 导出逐行结果到 CSV: id,status,error,channels
pub fn write_csv<W: Write>(summary: &BatchSummary, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["id", "status", "error", "channels"])?;

    for outcome in &summary.outcomes {
        let channels = outcome
            .channels
            .iter()
            .map(|d| format!("{}:{}", d.channel, status_str(d.status)))
            .collect::<Vec<_>>()
            .join(" ");
        writer.write_record([
            outcome.id.as_str(),
            status_str(outcome.status),
            outcome.error.as_deref().unwrap_or_default(),
            channels.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
