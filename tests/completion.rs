mod helpers;

use chrono::{Duration as ChronoDuration, Utc};
use futures::{SinkExt, StreamExt};
use helpers::setup::spawn_app;
use sandglass_sdk::{ChangeTargetTimeInput, CreateTimerInput};
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[actix_web::test]
async fn test_timer_completes_at_its_target_instant() {
    let (_, sdk, _) = spawn_app().await;

    let timer = sdk
        .timer
        .create(CreateTimerInput {
            target_seconds: 2,
            owner_id: "u1".into(),
        })
        .await
        .unwrap()
        .timer;

    // The key expiry fires at the target instant; one server wins the lock
    // and commits the completion. Poll the stats until the winner's log
    // lands.
    let mut completed = false;
    for _ in 0..40 {
        sleep(Duration::from_millis(250)).await;
        let stats = sdk.monitoring.completion_stats().await.unwrap().stats;
        if stats.successful_completions >= 1 {
            completed = true;
            break;
        }
    }
    assert!(completed, "expected a successful completion log within 10s");

    let fetched = sdk
        .timer
        .get(timer.timer_id.clone(), Some("u1".into()))
        .await
        .unwrap()
        .timer;
    assert!(fetched.completed);
    assert_eq!(fetched.remaining_millis, 0);

    // A completed timer is nothing for the monitor to report.
    let report = sdk.monitoring.detect_missed_timers().await.unwrap();
    assert!(report.missed_timers.is_empty());
}

#[actix_web::test]
async fn test_target_change_replaces_the_pending_expiry() {
    let (_, sdk, _) = spawn_app().await;

    let timer = sdk
        .timer
        .create(CreateTimerInput {
            target_seconds: 2,
            owner_id: "u1".into(),
        })
        .await
        .unwrap()
        .timer;

    sdk.timer
        .change_target_time(ChangeTargetTimeInput {
            timer_id: timer.timer_id.clone(),
            new_target_time: Utc::now() + ChronoDuration::minutes(10),
            changed_by: "u1".into(),
        })
        .await
        .expect("Expected target change to succeed");

    // The original 2s expiry must not fire anymore.
    sleep(Duration::from_secs(4)).await;
    let stats = sdk.monitoring.completion_stats().await.unwrap().stats;
    assert_eq!(stats.successful_completions, 0);

    let fetched = sdk
        .timer
        .get(timer.timer_id.clone(), Some("u1".into()))
        .await
        .unwrap()
        .timer;
    assert!(!fetched.completed);
    assert!(fetched.remaining_millis > 0);
}

#[actix_web::test]
async fn test_subscribed_session_receives_the_completion_fanout() {
    let (app, sdk, _) = spawn_app().await;

    let timer = sdk
        .timer
        .create(CreateTimerInput {
            target_seconds: 3,
            owner_id: "owner".into(),
        })
        .await
        .unwrap()
        .timer;

    let (_resp, mut connection) = awc::Client::new()
        .ws(format!(
            "ws://127.0.0.1:{}/api/v1/ws?userId=viewer",
            app.port
        ))
        .connect()
        .await
        .expect("Expected websocket connect to succeed");

    connection
        .send(awc::ws::Message::Text(
            format!(
                r#"{{"command":"subscribe","timerId":"{}"}}"#,
                timer.timer_id
            )
            .into(),
        ))
        .await
        .unwrap();

    let mut got_snapshot = false;
    let mut got_count_update = false;
    let mut got_completion = false;

    // Drain frames until the completion event lands or the deadline passes.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline && !got_completion {
        let frame = match timeout(Duration::from_secs(2), connection.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(_))) | Ok(None) => break,
            Err(_) => continue,
        };
        match frame {
            awc::ws::Frame::Text(payload) => {
                let text = String::from_utf8(payload.to_vec()).unwrap();
                if text.contains("\"timer\"") {
                    got_snapshot = true;
                } else if text.contains("ONLINE_USER_COUNT_UPDATED") {
                    got_count_update = true;
                } else if text.contains("TIMER_COMPLETED") {
                    got_completion = true;
                }
            }
            awc::ws::Frame::Ping(payload) => {
                let _ = connection.send(awc::ws::Message::Pong(payload)).await;
            }
            _ => {}
        }
    }

    assert!(got_snapshot, "expected the subscription snapshot");
    assert!(got_count_update, "expected an online-count update");
    assert!(got_completion, "expected the TIMER_COMPLETED fanout");

    // The share-link subscription was counted fleet-wide.
    let fetched = sdk
        .timer
        .get(timer.timer_id.clone(), Some("owner".into()))
        .await
        .unwrap()
        .timer;
    assert!(fetched.completed);
}
