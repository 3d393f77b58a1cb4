//! End-to-end decision flow: mask, callback, recipients, batching, workers.

mod common;

use alert_lifecycle::model::{Event, Status};
use alert_lifecycle::store::MaskRule;
use alert_lifecycle::worker::{event_queue, spawn_workers};
use common::{Harness, T0, alert, eventually, open_current, recovery, strategy};

#[tokio::test]
async fn test_masked_event_is_recorded_and_not_notified() {
    let h = Harness::new(vec![strategy(1, [0, 0], 1)]);
    h.masks.replace_all(vec![MaskRule {
        endpoints: vec!["host-1".into()],
        btime: T0 - 60,
        etime: T0 + 60,
        ..Default::default()
    }]);
    h.events.insert_current(open_current(7));
    let (engine, batcher) = h.engine();

    let event = alert(1, 7, T0);
    h.events.insert_event(&event);
    assert_eq!(engine.consume(event).await, Status::Mask);

    assert_eq!(h.events.status_of(1).as_deref(), Some("mask"));
    assert_eq!(h.events.current(7).map(|c| c.status).as_deref(), Some("mask"));
    assert_eq!(batcher.pending(), 0);
    assert_eq!(h.queues.total(), 0);
}

#[tokio::test]
async fn test_event_without_recipients_is_marked_none_user() {
    let h = Harness::new(vec![strategy(1, [3600, 5], 1)]);
    let (engine, _batcher) = h.engine();

    let event = Event {
        users: "[]".into(),
        groups: "[]".into(),
        ..alert(1, 7, T0)
    };
    h.events.insert_event(&event);
    assert_eq!(engine.consume(event).await, Status::NoneUser);
    assert_eq!(h.events.status_of(1).as_deref(), Some("none_user"));
}

#[tokio::test]
async fn test_callback_is_pushed_before_notification() {
    let mut stra = strategy(1, [3600, 5], 1);
    stra.callback = "http://hooks.example.com/alert".into();
    let h = Harness::new(vec![stra]);
    let (engine, _batcher) = h.engine();

    let event = alert(1, 7, T0);
    h.events.insert_event(&event);
    assert_eq!(engine.consume(event).await, Status::Send);

    let callbacks = h
        .queues
        .messages(&h.services.config.notify.callback_queue);
    assert_eq!(callbacks.len(), 1);
    let pushed: Event = serde_json::from_str(&callbacks[0]).expect("callback payload");
    assert_eq!(pushed.id, 1);
    assert_eq!(pushed.hashid, 7);
    assert_eq!(h.events.status_of(1).as_deref(), Some("send"));

    // recoveries never trigger callbacks
    let rec = recovery(2, 7, T0 + 10);
    h.events.insert_event(&rec);
    engine.consume(rec).await;
    assert_eq!(
        h.queues
            .len(&h.services.config.notify.callback_queue),
        1
    );
}

#[tokio::test]
async fn test_high_priority_alert_fans_out_to_routed_channels() {
    let h = Harness::new(vec![strategy(1, [3600, 5], 1)]);
    h.events.insert_current(open_current(7));
    let (engine, _batcher) = h.engine();

    let event = alert(1, 7, T0);
    h.events.insert_event(&event);
    assert_eq!(engine.consume(event).await, Status::Send);

    assert!(eventually(|| h.messages("im").len() == 1).await);
    for channel in ["voice", "sms", "mail", "im"] {
        assert_eq!(h.messages(channel).len(), 1, "channel {channel}");
    }

    let voice = h.messages("voice").remove(0);
    assert_eq!(voice["Content"], "cpu.idle too low");
    assert_eq!(voice["Type"], "voice");

    let sms = h.messages("sms").remove(0);
    let text = sms["Content"].as_str().expect("sms text");
    assert!(text.contains("Endpoint: host-1"));
    assert!(text.contains("Tags: core=0"));
    assert!(text.contains("Claim: http://portal/claim/507"));
    assert_eq!(sms["Tos"][0], "1001");

    let mail = h.messages("mail").remove(0);
    assert_eq!(mail["Subject"], "[P1 alert]cpu.idle too low - host-1");
    assert_eq!(mail["Tos"][0], "user1@example.com");
}

#[tokio::test]
async fn test_recovery_skips_voice() {
    let h = Harness::new(vec![strategy(1, [3600, 5], 1)]);
    let (engine, _batcher) = h.engine();

    let event = recovery(1, 7, T0);
    h.events.insert_event(&event);
    assert_eq!(engine.consume(event).await, Status::Send);

    assert!(eventually(|| h.messages("im").len() == 1).await);
    assert!(h.messages("voice").is_empty());
    let sms = h.messages("sms").remove(0);
    assert!(
        !sms["Content"]
            .as_str()
            .expect("sms text")
            .contains("Claim:")
    );
}

#[tokio::test]
async fn test_low_priority_events_are_batched_per_strategy() {
    let h = Harness::new(vec![strategy(1, [3600, 5], 1)]);
    let (engine, batcher) = h.engine();

    let first = Event {
        priority: 3,
        detail: r#"[{"metric":"disk.used","tags":{"mount":"/"}}]"#.into(),
        ..alert(1, 7, T0)
    };
    let second = Event {
        priority: 3,
        endpoint: "host-2".into(),
        detail: r#"[{"metric":"disk.used","tags":{"mount":"/data"}}]"#.into(),
        ..alert(2, 8, T0 + 30)
    };
    for event in [first, second] {
        h.events.insert_event(&event);
        assert_eq!(engine.consume(event).await, Status::Queued);
    }

    // nothing is recorded until the batch is flushed
    assert_eq!(batcher.pending(), 2);
    assert_eq!(h.events.status_of(1).as_deref(), Some(""));

    assert_eq!(batcher.flush().await, 1);
    assert_eq!(batcher.pending(), 0);
    assert_eq!(h.events.status_of(1).as_deref(), Some("send"));
    assert_eq!(h.events.status_of(2).as_deref(), Some("send"));

    assert!(eventually(|| h.messages("im").len() == 1).await);
    // p3 routes to mail and im only
    assert!(h.messages("sms").is_empty());

    let mail = h.messages("mail").remove(0);
    assert_eq!(
        mail["Subject"],
        "[P3 aggregated alert]cpu.idle too low - host-1,host-2 (2)"
    );
    let im = h.messages("im")[0]["Content"]
        .as_str()
        .expect("im text")
        .to_string();
    assert!(im.contains("Tags: mount=[/,/data]"));
    assert!(im.contains("Metric: disk.used"));
    assert!(im.contains("~"));
}

#[tokio::test]
async fn test_alerts_and_recoveries_are_batched_apart() {
    let h = Harness::new(vec![strategy(1, [3600, 5], 1)]);
    h.events.insert_current(open_current(7));
    let (engine, batcher) = h.engine();

    let open = Event {
        priority: 3,
        ..alert(1, 7, T0)
    };
    let closed = Event {
        priority: 3,
        ..recovery(2, 8, T0 + 30)
    };
    for event in [open, closed] {
        h.events.insert_event(&event);
        assert_eq!(engine.consume(event).await, Status::Queued);
    }
    assert_eq!(batcher.pending(), 2);

    assert_eq!(batcher.flush().await, 2);
    assert!(eventually(|| h.messages("im").len() == 2).await);

    let mut subjects: Vec<String> = h
        .messages("mail")
        .iter()
        .map(|m| m["Subject"].as_str().expect("mail subject").to_string())
        .collect();
    subjects.sort();
    assert_eq!(
        subjects,
        [
            "[P3 alert]cpu.idle too low - host-1",
            "[P3 recovery]cpu.idle too low - host-1",
        ]
    );

    for im in h.messages("im") {
        let text = im["Content"].as_str().expect("im text");
        if text.contains("Status: P3 recovery") {
            assert!(!text.contains("Claim:"));
        } else {
            assert!(text.contains("Status: P3 alert"));
            assert!(text.contains("Claim: http://portal/claim/507"));
        }
    }
}

#[tokio::test]
async fn test_flush_with_nothing_pending() {
    let h = Harness::new(vec![]);
    let (_engine, batcher) = h.engine();
    assert_eq!(batcher.flush().await, 0);
}

#[tokio::test]
async fn test_workers_drain_queue() {
    let h = Harness::new(vec![strategy(1, [0, 5], 1)]);
    let (engine, _batcher) = h.engine();
    let (tx, rx) = event_queue(16);
    let workers = spawn_workers(engine, rx, 3);

    for id in 1..=6 {
        let event = alert(id, id as u64, T0);
        h.events.insert_event(&event);
        tx.send(event).await.expect("queue open");
    }
    drop(tx);
    for worker in workers {
        worker.await.expect("worker exits cleanly");
    }

    for id in 1..=6 {
        assert_eq!(h.events.status_of(id).as_deref(), Some("send"));
    }
}
