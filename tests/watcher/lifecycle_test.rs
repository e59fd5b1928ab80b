//! Watcher start, delivery and shutdown through the client.

use serde_json::json;

use gerrit_ssh::config::ConfigError;
use gerrit_ssh::stream::STREAM_EVENTS_COMMAND;
use gerrit_ssh::watcher::WatcherStatus;

use crate::support::{client, next_event, record, wait_for_status, ScriptedProvider, Step, TEST_TIMEOUT};

#[tokio::test]
async fn test_records_delivered_in_stream_order() {
    let provider = ScriptedProvider::new([Step::Hold("{\"a\":1}\n{\"b\":2}\n".to_string())]);
    let mut client = client(&provider);

    client.start_watching(-1, 0.0).unwrap();

    assert_eq!(next_event(&client).await, record(json!({"a": 1})));
    assert_eq!(next_event(&client).await, record(json!({"b": 2})));
    assert!(client.try_get_event().is_none());
    assert_eq!(provider.commands(), vec![STREAM_EVENTS_COMMAND]);

    wait_for_status(&client, WatcherStatus::Consuming).await;
    let tracker = client.status_tracker().unwrap();
    client.stop_watching().await.unwrap();

    assert_eq!(provider.closes(), 1);
    assert_eq!(
        tracker.history(),
        vec![
            WatcherStatus::Idle,
            WatcherStatus::Disconnected,
            WatcherStatus::Connecting,
            WatcherStatus::Connected,
            WatcherStatus::Consuming,
            WatcherStatus::Dead,
        ]
    );
}

#[tokio::test]
async fn test_client_without_watcher_is_idle() {
    let provider = ScriptedProvider::new([]);
    let mut client = client(&provider);

    assert_eq!(client.watcher_status(), WatcherStatus::Idle);
    assert!(client.status_tracker().is_none());
    assert!(client.try_get_event().is_none());
    client.stop_watching().await.unwrap();
    assert_eq!(provider.opens(), 0);
}

#[tokio::test]
async fn test_negative_retry_delay_starts_nothing() {
    let provider = ScriptedProvider::new([]);
    let mut client = client(&provider);

    let err = client.start_watching(-1, -1.0).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidRetryDelay { .. }));
    assert!(client.status_tracker().is_none());
    assert_eq!(provider.opens(), 0);
}

#[tokio::test]
async fn test_stop_while_consuming_closes_session() {
    let provider = ScriptedProvider::new([Step::Hold(String::new())]);
    let mut client = client(&provider);
    client.start_watching(-1, 0.0).unwrap();

    wait_for_status(&client, WatcherStatus::Consuming).await;
    let tracker = client.status_tracker().unwrap();
    client.stop_watching().await.unwrap();

    assert_eq!(tracker.current(), WatcherStatus::Dead);
    assert_eq!(provider.opens(), 1);
    assert_eq!(provider.closes(), 1);
    assert_eq!(client.watcher_status(), WatcherStatus::Idle);
}

#[tokio::test]
async fn test_dropping_client_cancels_watcher() {
    let provider = ScriptedProvider::new([Step::Hold(String::new())]);
    let mut client = client(&provider);
    client.start_watching(-1, 0.0).unwrap();
    wait_for_status(&client, WatcherStatus::Consuming).await;

    let tracker = client.status_tracker().unwrap();
    let mut status = tracker.subscribe();
    drop(client);

    tokio::time::timeout(TEST_TIMEOUT, status.wait_for(|s| *s == WatcherStatus::Dead))
        .await
        .expect("Watcher did not stop")
        .unwrap();
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_restart_replaces_running_watcher() {
    let provider = ScriptedProvider::new([
        Step::Hold(String::new()),
        Step::Hold("{\"second\":true}\n".to_string()),
    ]);
    let mut client = client(&provider);

    client.start_watching(-1, 0.0).unwrap();
    wait_for_status(&client, WatcherStatus::Consuming).await;
    let first = client.status_tracker().unwrap();

    client.start_watching(-1, 0.0).unwrap();
    assert_eq!(next_event(&client).await, record(json!({"second": true})));

    let mut status = first.subscribe();
    tokio::time::timeout(TEST_TIMEOUT, status.wait_for(|s| *s == WatcherStatus::Dead))
        .await
        .expect("First watcher did not stop")
        .unwrap();
    assert_eq!(provider.opens(), 2);
    client.stop_watching().await.unwrap();
}

#[tokio::test]
async fn test_events_reach_blocking_consumer() {
    let provider = ScriptedProvider::new([Step::Hold("{\"change\":{\"number\":7}}\n".to_string())]);
    let mut client = client(&provider);
    let queue = client.event_queue();
    let consumer = tokio::task::spawn_blocking(move || queue.blocking_pop());

    client.start_watching(-1, 0.0).unwrap();

    let event = tokio::time::timeout(TEST_TIMEOUT, consumer)
        .await
        .expect("Timed out waiting for the blocking consumer")
        .unwrap();
    assert_eq!(event, record(json!({"change": {"number": 7}})));
    client.stop_watching().await.unwrap();
}

#[tokio::test]
async fn test_chatty_stderr_does_not_stall_events() {
    let provider = ScriptedProvider::new([Step::NoisyHold {
        stderr_lines: 10_000,
        stdout: "{\"after\":\"noise\"}\n".to_string(),
    }]);
    let mut client = client(&provider);
    client.start_watching(-1, 0.0).unwrap();

    assert_eq!(next_event(&client).await, record(json!({"after": "noise"})));
    client.stop_watching().await.unwrap();
}
