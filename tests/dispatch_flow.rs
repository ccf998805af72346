//! End-to-end dispatcher scenarios with in-memory collaborators
//!
//! Exercises the full flow: registration -> queue membership -> task
//! dispatch -> deferral -> reconciliation on join, checking the channel
//! announcements and the audit rows along the way.

use async_trait::async_trait;
use opsq::audit::spawn_audit_worker;
use opsq::collab::{AuditRecord, AuditSink, IdentityResolver, Notifier};
use opsq::dispatch::{JoinOutcome, TaskOutcome};
use opsq::{Dispatcher, Error, Result};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct ChannelLog {
    posts: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for ChannelLog {
    async fn post(&self, channel: &str, text: &str) -> Result<()> {
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

struct Directory;

#[async_trait]
impl IdentityResolver for Directory {
    async fn display_name_for(&self, user_id: &str) -> Result<Option<String>> {
        match user_id {
            "U1" => Ok(Some("Alice".to_string())),
            "U2" => Ok(Some("Bob".to_string())),
            "U3" => Ok(Some("Carol".to_string())),
            "ADMIN" => Ok(Some("Admin".to_string())),
            _ => Ok(None),
        }
    }

    async fn is_member_of_allowed_group(&self, user_id: &str) -> Result<bool> {
        Ok(user_id == "ADMIN")
    }
}

struct SpreadsheetStub {
    rows: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditSink for SpreadsheetStub {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct Harness {
    dispatcher: Dispatcher,
    channel: Arc<ChannelLog>,
    sheet: Arc<SpreadsheetStub>,
    _temp: TempDir,
}

fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let channel = Arc::new(ChannelLog {
        posts: Mutex::new(Vec::new()),
    });
    let sheet = Arc::new(SpreadsheetStub {
        rows: Mutex::new(Vec::new()),
    });
    let dispatcher = Dispatcher::new(
        temp.path(),
        channel.clone(),
        Arc::new(Directory),
        spawn_audit_worker(sheet.clone()),
        "C-GENERAL",
    );
    Harness {
        dispatcher,
        channel,
        sheet,
        _temp: temp,
    }
}

fn langs(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|s| (*s).to_string()).collect()
}

async fn drain_audit() {
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
}

#[tokio::test]
async fn full_dispatch_cycle() {
    let h = harness();

    // Two operators register and join: queue = [Alice(EN), Bob(EN,FR)]
    h.dispatcher.register("U1", langs(&["EN"])).await.unwrap();
    h.dispatcher
        .register("U2", langs(&["EN", "FR"]))
        .await
        .unwrap();
    h.dispatcher.join_queue("U1").await.unwrap();
    h.dispatcher.join_queue("U2").await.unwrap();

    // An FR task skips Alice and takes Bob
    let outcome = h
        .dispatcher
        .create_task("refund request", "FR")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TaskOutcome::Assigned {
            user_id: "U2".to_string(),
            display_name: "Bob".to_string(),
        }
    );

    let queue = h.dispatcher.list_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].0.user_id, "U1");

    // The assignment was announced and audited
    let posts = h.channel.posts.lock().unwrap().clone();
    assert!(posts
        .iter()
        .any(|(c, text)| c == "C-GENERAL" && text == "refund request <@U2> (FR)"));

    drain_audit().await;
    let rows = h.sheet.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].message, "refund request");
    assert_eq!(rows[0].language, "FR");
    assert_eq!(rows[0].display_name, "Bob");
}

#[tokio::test]
async fn deferral_and_reconciliation() {
    let h = harness();

    // Nobody speaks DE: the task is deferred and the channel alerted
    let outcome = h.dispatcher.create_task("hilfe bitte", "DE").await.unwrap();
    assert_eq!(outcome, TaskOutcome::Deferred);
    assert_eq!(h.dispatcher.list_awaiting().await.len(), 1);

    let posts = h.channel.posts.lock().unwrap().clone();
    assert!(posts.iter().any(|(_, text)| text.contains("(DE)")));

    // Carol registers with DE and joins: the task is hers, she never queues
    h.dispatcher.register("U3", langs(&["DE"])).await.unwrap();
    let outcome = h.dispatcher.join_queue("U3").await.unwrap();
    match outcome {
        JoinOutcome::AutoAssigned { task } => {
            assert_eq!(task.message, "hilfe bitte");
        }
        other => panic!("expected AutoAssigned, got {other:?}"),
    }

    assert!(h.dispatcher.list_awaiting().await.is_empty());
    assert!(h.dispatcher.list_queue().await.is_empty());

    drain_audit().await;
    let rows = h.sheet.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].display_name, "Carol");
}

#[tokio::test]
async fn pause_resume_round_trip() {
    let h = harness();

    h.dispatcher.register("U1", langs(&["EN"])).await.unwrap();
    h.dispatcher.register("U2", langs(&["EN"])).await.unwrap();
    h.dispatcher.join_queue("U1").await.unwrap();
    h.dispatcher.join_queue("U2").await.unwrap();

    // Paused Alice is skipped; Bob takes the task
    h.dispatcher.pause("U1", "on a call").await.unwrap();
    let outcome = h.dispatcher.create_task("first", "EN").await.unwrap();
    assert!(matches!(outcome, TaskOutcome::Assigned { ref user_id, .. } if user_id == "U2"));

    // Resumed Alice is eligible again
    h.dispatcher.resume_and_promote("U1").await.unwrap();
    let outcome = h.dispatcher.create_task("second", "EN").await.unwrap();
    assert!(matches!(outcome, TaskOutcome::Assigned { ref user_id, .. } if user_id == "U1"));

    let posts = h.channel.posts.lock().unwrap().clone();
    assert!(posts
        .iter()
        .any(|(_, text)| text.contains("paused in queue. Reason: \"on a call\"")));
}

#[tokio::test]
async fn state_survives_restart() {
    let temp = TempDir::new().unwrap();
    let channel = Arc::new(ChannelLog {
        posts: Mutex::new(Vec::new()),
    });
    let sheet = Arc::new(SpreadsheetStub {
        rows: Mutex::new(Vec::new()),
    });

    {
        let dispatcher = Dispatcher::new(
            temp.path(),
            channel.clone(),
            Arc::new(Directory),
            spawn_audit_worker(sheet.clone()),
            "C-GENERAL",
        );
        dispatcher.register("U1", langs(&["EN"])).await.unwrap();
        dispatcher.join_queue("U1").await.unwrap();
        dispatcher.create_task("hilfe", "DE").await.unwrap();
    }

    // A fresh dispatcher over the same data dir sees identical state
    let dispatcher = Dispatcher::new(
        temp.path(),
        channel,
        Arc::new(Directory),
        spawn_audit_worker(sheet),
        "C-GENERAL",
    );

    let queue = dispatcher.list_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].0.user_id, "U1");
    assert_eq!(queue[0].1, langs(&["EN"]));

    let awaiting = dispatcher.list_awaiting().await;
    assert_eq!(awaiting.len(), 1);
    assert_eq!(awaiting[0].message, "hilfe");
}

#[tokio::test]
async fn admin_hands_over_awaiting_task() {
    let h = harness();

    h.dispatcher.create_task("first", "DE").await.unwrap();
    h.dispatcher.create_task("second", "DE").await.unwrap();
    h.dispatcher.register("U1", langs(&["EN"])).await.unwrap();
    h.dispatcher.join_queue("U1").await.unwrap();

    // Give task #2 (0-based index 1) to Alice despite the language mismatch
    let task = h.dispatcher.give_awaiting(1, "Alice").await.unwrap();
    assert_eq!(task.message, "second");

    let awaiting = h.dispatcher.list_awaiting().await;
    assert_eq!(awaiting.len(), 1);
    assert_eq!(awaiting[0].message, "first");
    assert!(h.dispatcher.list_queue().await.is_empty());
}

#[tokio::test]
async fn concurrent_tasks_never_double_assign() {
    let h = harness();

    h.dispatcher.register("U1", langs(&["EN"])).await.unwrap();
    h.dispatcher.join_queue("U1").await.unwrap();

    let dispatcher = Arc::new(h.dispatcher);
    let a = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.create_task("task a", "EN").await })
    };
    let b = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.create_task("task b", "EN").await })
    };

    let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];

    // Exactly one task got the only operator; the other was deferred
    let assigned = outcomes
        .iter()
        .filter(|o| matches!(o, TaskOutcome::Assigned { .. }))
        .count();
    assert_eq!(assigned, 1);
    assert_eq!(dispatcher.list_awaiting().await.len(), 1);
    assert!(dispatcher.list_queue().await.is_empty());
}

#[tokio::test]
async fn unknown_operator_cannot_register_without_directory_entry() {
    let h = harness();

    let result = h.dispatcher.register("U9", langs(&["EN"])).await;
    assert!(matches!(result, Err(Error::Identity(_))));
}
