mod common;

use common::{pipeline, ScriptedSender};
use invoice_dispatch::delivery::ChannelSenders;
use invoice_dispatch::models::{Channel, ChannelSet, OutcomeStatus, RawRow};
use serde_json::json;
use std::sync::Arc;

fn rows(value: serde_json::Value) -> Vec<RawRow> {
    serde_json::from_value(value).unwrap()
}

fn valid_rows(n: usize) -> Vec<RawRow> {
    (0..n)
        .map(|i| {
            serde_json::from_value(json!({
                "Name": format!("Customer {}", i),
                "Email": format!("c{}@example.com", i),
                "Phone": format!("+1555000{}", i),
                "Amount": 100 + i,
            }))
            .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn invalid_row_is_counted_as_failed() {
    let email = Arc::new(ScriptedSender::default());
    let pipeline = pipeline(ChannelSenders::default().with(Channel::Email, email.clone()));

    let input = rows(json!([
        {"Name": "John", "Email": "j@x.com", "Amount": 100, "Tax": 10},
        {"Name": "", "Email": "bad"}
    ]));
    let summary = pipeline.run(&input, None, None).await;

    assert_eq!((summary.sent_count, summary.failed_count), (1, 1));
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Sent);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(
        summary.outcomes[1].error.as_deref(),
        Some("missing required field: name")
    );
    // 无效行不触发发送
    assert_eq!(email.recipients(), vec!["j@x.com".to_string()]);
}

#[tokio::test]
async fn second_send_failure_only_fails_second_row() {
    let email = Arc::new(ScriptedSender::failing_on(2));
    let pipeline = pipeline(ChannelSenders::default().with(Channel::Email, email.clone()));

    let summary = pipeline.run(&valid_rows(3), None, None).await;

    assert_eq!((summary.sent_count, summary.failed_count), (2, 1));
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Sent);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(summary.outcomes[2].status, OutcomeStatus::Sent);
    assert_eq!(email.calls(), 3);
}

#[tokio::test]
async fn every_row_is_accounted_for_in_input_order() {
    for failing_call in 1..=5 {
        let email = Arc::new(ScriptedSender::failing_on(failing_call));
        let pipeline = pipeline(ChannelSenders::default().with(Channel::Email, email));

        let mut input = valid_rows(5);
        // 第 3 行缺少 email
        input[2].shift_remove("Email");
        let summary = pipeline.run(&input, None, None).await;

        assert_eq!(summary.total(), input.len());
        // 生成的 id 以行下标结尾
        for (i, outcome) in summary.outcomes.iter().enumerate() {
            assert!(outcome.id.ends_with(&format!("-{}", i)), "outcome {} is {}", i, outcome.id);
        }
        assert_eq!(summary.outcomes[2].error.as_deref(), Some("missing required field: email"));
    }
}

#[tokio::test]
async fn email_failure_skips_sms_for_that_row_only() {
    let email = Arc::new(ScriptedSender::failing_on(1));
    let sms = Arc::new(ScriptedSender::default());
    let pipeline = pipeline(
        ChannelSenders::default()
            .with(Channel::Email, email.clone())
            .with(Channel::Sms, sms.clone()),
    );

    let channels: ChannelSet = vec![Channel::Email, Channel::Sms].into();
    let summary = pipeline.run(&valid_rows(2), None, Some(channels)).await;

    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Failed);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Sent);
    // 只有第二行发了短信
    assert_eq!(sms.recipients(), vec!["+15550001".to_string()]);
}

#[tokio::test]
async fn supplied_ids_are_kept() {
    let email = Arc::new(ScriptedSender::default());
    let pipeline = pipeline(ChannelSenders::default().with(Channel::Email, email));

    let input = rows(json!([
        {"id": "inv-1700000000000-0", "name": "A", "email": "a@x.com", "amount": "10"}
    ]));
    let summary = pipeline.run(&input, None, None).await;
    assert_eq!(summary.outcomes[0].id, "inv-1700000000000-0");
}

#[tokio::test]
async fn empty_channel_set_never_reports_sent() {
    let email = Arc::new(ScriptedSender::default());
    let pipeline = pipeline(ChannelSenders::default().with(Channel::Email, email.clone()));

    let summary = pipeline.run(&valid_rows(2), None, Some(ChannelSet::default())).await;

    assert_eq!((summary.sent_count, summary.failed_count), (0, 2));
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.error.as_deref() == Some("no delivery channel enabled")));
    assert_eq!(email.calls(), 0);
}
