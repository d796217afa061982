// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use roomsync_config::model::AckMode;
use roomsync_core::{ConnectionState, ConversationId, Credential, DeliveryStatus, RoomsyncError};
use roomsync_session::{
    AckPolicy, ConversationSession, HistoryStatus, SessionConfig, SessionHandle,
};
use roomsync_test_utils::{ConnectOutcome, HistoryReply, MockConnector, MockHistory, fixtures};

fn spawn(
    connector: &Arc<MockConnector>,
    history: &Arc<MockHistory>,
    ack: AckPolicy,
) -> (SessionHandle, tokio::task::JoinHandle<()>, CancellationToken) {
    let session = ConversationSession::new(
        SessionConfig {
            ack,
            ..SessionConfig::default()
        },
        connector.clone(),
        history.clone(),
        Arc::new(Some(Credential::new("token"))),
    );
    let cancel = CancellationToken::new();
    let (handle, task) = SessionHandle::spawn(session, cancel.clone());
    (handle, task, cancel)
}

#[tokio::test(start_paused = true)]
async fn handle_drives_session_on_its_own_task() {
    let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
    let history = Arc::new(MockHistory::new());
    history.reply(
        "room",
        HistoryReply::Messages(vec![fixtures::message(1, "room", 1)]),
    );
    let (handle, task, cancel) = spawn(&connector, &history, AckPolicy::default());
    let mut snapshots = handle.subscribe();

    handle.select(ConversationId::new("room")).await.unwrap();
    snapshots
        .wait_for(|s| {
            s.connection_state == ConnectionState::Open && s.history == HistoryStatus::Loaded
        })
        .await
        .unwrap();

    let link = connector.link(0).await;
    link.push_message(&fixtures::message(2, "room", 2));
    snapshots.wait_for(|s| s.messages.len() == 2).await.unwrap();

    let pending = handle.send("hi").await.unwrap();
    assert_eq!(pending.status, DeliveryStatus::Sent);
    link.wait_sent(1).await;
    assert_eq!(link.sent_texts(), vec!["hi"]);

    cancel.cancel();
    task.await.unwrap();
    assert!(matches!(
        handle.send("late").await,
        Err(RoomsyncError::Internal(_))
    ));
    assert_eq!(handle.snapshot().conversation_id, None);
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_send_fails_after_timeout() {
    let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
    let history = Arc::new(MockHistory::new());
    let ack = AckPolicy {
        mode: AckMode::Echo,
        timeout: Duration::from_secs(3),
    };
    let (handle, _task, _cancel) = spawn(&connector, &history, ack);
    let mut snapshots = handle.subscribe();

    handle.select(ConversationId::new("room")).await.unwrap();
    snapshots
        .wait_for(|s| s.connection_state == ConnectionState::Open)
        .await
        .unwrap();

    let pending = handle.send("anyone?").await.unwrap();
    assert_eq!(pending.status, DeliveryStatus::Queued);

    snapshots
        .wait_for(|s| {
            s.pending
                .first()
                .is_some_and(|p| p.status == DeliveryStatus::Failed)
        })
        .await
        .unwrap();

    assert!(handle.retry(pending.token.clone()).await.unwrap());
    connector.link(0).await.wait_sent(2).await;
}

#[tokio::test]
async fn refresh_without_selection_reports_error() {
    let connector = Arc::new(MockConnector::new());
    let history = Arc::new(MockHistory::new());
    let (handle, _task, _cancel) = spawn(&connector, &history, AckPolicy::default());
    assert!(matches!(
        handle.refresh_history().await,
        Err(RoomsyncError::NoConversation)
    ));
}
