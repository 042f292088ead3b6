use crate::models::Channel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Sent,
    Failed,
}

/// 单个渠道的投递结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDelivery {
    pub channel: Channel,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 单行处理结果，与输入行一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 实际尝试过的渠道 (校验/渲染失败时为空)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelDelivery>,
}

impl BatchOutcome {
    pub fn sent(id: impl Into<String>, channels: Vec<ChannelDelivery>) -> Self {
        Self {
            id: id.into(),
            status: OutcomeStatus::Sent,
            error: None,
            channels,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
            channels: Vec::new(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == OutcomeStatus::Sent
    }
}

/// 批次汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sent_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchSummary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sent_count: 0,
            failed_count: 0,
            outcomes: Vec::with_capacity(capacity),
        }
    }

    /// 追加结果并更新计数
    pub fn push(&mut self, outcome: BatchOutcome) {
        if outcome.is_sent() {
            self.sent_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.sent_count + self.failed_count
    }
}

impl FromIterator<BatchOutcome> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = BatchOutcome>>(iter: I) -> Self {
        let mut summary = BatchSummary::default();
        for outcome in iter {
            summary.push(outcome);
        }
        summary
    }
}
