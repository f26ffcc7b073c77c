//! End-to-end dispatcher tests against the simulated chat hub and memory backend.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use relaybot_core::storage::SessionStore;
use relaybot_types::config::BusyPolicy;
use relaybot_types::engine::Engine;
use relaybot_types::error::DispatchError;
use relaybot_types::message::InboundMessage;
use relaybot_types::session::EngineState;

use common::{HubReply, MemoryStore, harness, harness_with};

async fn send(h: &common::Harness, sender: &str, body: &str) -> Option<String> {
    h.dispatcher
        .handle(&InboundMessage::direct(sender, body), &CancellationToken::new())
        .await
        .unwrap()
        .map(|reply| reply.text)
}

fn stored_sequence(h: &common::Harness, key: &str) -> Option<u32> {
    match h.store().record(key)?.state? {
        EngineState::Streaming { context } => context.map(|c| c.invocation_sequence),
        EngineState::Memory { .. } => None,
    }
}

#[tokio::test]
async fn reset_then_info_reports_zero_turns() {
    let h = harness();
    let reset = send(&h, "alice", "/reset").await.unwrap();
    assert!(reset.contains("reset"));

    let info = send(&h, "alice", "/info").await.unwrap();
    assert!(info.contains("session_key:alice"));
    assert!(info.contains("engine:bing"));
    assert!(info.lines().any(|l| l == "turn_count:0"));
}

#[tokio::test]
async fn two_prompts_return_hub_answers_and_persist_sequence() {
    let h = harness();
    h.hub.answer("first answer");
    h.hub.answer("second answer");

    assert_eq!(send(&h, "alice", "hello").await.unwrap(), "first answer");
    assert_eq!(send(&h, "alice", "and again").await.unwrap(), "second answer");

    assert_eq!(stored_sequence(&h, "alice"), Some(2));
    assert_eq!(h.hub.invocation_ids(), vec!["0", "1"]);
    assert_eq!(h.hub.conversations_created(), 1);
    assert_eq!(h.store().record("alice").unwrap().turn_count, 2);
}

#[tokio::test]
async fn stale_message_has_no_side_effects() {
    let h = harness();
    let mut message = InboundMessage::direct("alice", "hello");
    message.timestamp = Utc::now() - ChronoDuration::minutes(10);

    let reply = h
        .dispatcher
        .handle(&message, &CancellationToken::new())
        .await
        .unwrap();
    assert!(reply.is_none());
    assert_eq!(h.store().writes(), 0);
    assert_eq!(h.registry.live_count(), 0);
    assert_eq!(h.hub.conversations_created(), 0);
}

#[tokio::test]
async fn group_message_requires_mention_and_gets_prefix() {
    let h = harness();
    h.hub.answer("pong");

    let mut message = InboundMessage::direct("wxid_alice", "@Relay\u{2005}ping");
    message.is_group = true;
    message.sender_name = Some("Alice".to_string());

    let ignored = h
        .dispatcher
        .handle(&message, &CancellationToken::new())
        .await
        .unwrap();
    assert!(ignored.is_none());

    message.mentioned = true;
    let reply = h
        .dispatcher
        .handle(&message, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.text, "[bot]@Alice\u{2005}\n\npong");
    assert_eq!(reply.recipient, "wxid_alice");
}

#[tokio::test]
async fn group_command_after_ascii_space_mention() {
    let h = harness();
    let mut message = InboundMessage::direct("wxid_bob", "@Relay /style creative");
    message.is_group = true;
    message.mentioned = true;

    let reply = h
        .dispatcher
        .handle(&message, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert!(reply.text.contains("[creative]"));
    assert_eq!(
        h.store().record("wxid_bob").unwrap().style.map(|s| s.to_string()),
        Some("creative".to_string())
    );
}

#[tokio::test]
async fn empty_and_quoted_messages_are_dropped() {
    let h = harness();

    let mut mention_only = InboundMessage::direct("alice", "@Relay\u{2005}");
    mention_only.is_group = true;
    mention_only.mentioned = true;
    let reply = h
        .dispatcher
        .handle(&mention_only, &CancellationToken::new())
        .await
        .unwrap();
    assert!(reply.is_none());

    let quoted = "「[bot]@alice: earlier answer」\n- - - - - - - - - - - - - - -\nthanks";
    assert!(send(&h, "alice", quoted).await.is_none());

    assert_eq!(h.store().writes(), 0);
    assert_eq!(h.registry.live_count(), 0);
}

#[tokio::test]
async fn invalid_command_is_reported_without_writes() {
    let h = harness();
    let reply = send(&h, "alice", "/dance").await.unwrap();
    assert!(reply.starts_with("[WARN] invalid command [/dance]"));
    assert!(reply.contains("/help"));

    let reply = send(&h, "alice", "/engine gpt-9").await.unwrap();
    assert!(reply.starts_with("[WARN]"));
    assert!(reply.contains("bing, gpt-3.5-turbo"));

    assert_eq!(h.store().writes(), 0);
}

#[tokio::test]
async fn failed_ask_keeps_last_committed_sequence() {
    let h = harness();
    h.hub.answer("one");
    h.hub.push(HubReply::Drop);
    h.hub.answer("two");

    assert_eq!(send(&h, "alice", "q1").await.unwrap(), "one");

    let warning = send(&h, "alice", "q2").await.unwrap();
    assert!(warning.starts_with("[WARN]"));
    assert_eq!(stored_sequence(&h, "alice"), Some(1));
    assert_eq!(h.store().record("alice").unwrap().turn_count, 1);

    assert_eq!(send(&h, "alice", "q2 again").await.unwrap(), "two");
    assert_eq!(h.hub.invocation_ids(), vec!["0", "1", "1"]);
    assert_eq!(stored_sequence(&h, "alice"), Some(2));
}

#[tokio::test]
async fn rejected_sequence_requires_reset() {
    let h = harness();
    h.hub.answer("one");
    h.hub.push(HubReply::Reject);
    h.hub.answer("fresh");

    send(&h, "alice", "q1").await.unwrap();
    let warning = send(&h, "alice", "q2").await.unwrap();
    assert!(warning.starts_with("[WARN]"));
    assert!(warning.contains("/reset"));

    send(&h, "alice", "/reset").await.unwrap();
    assert_eq!(h.store().record("alice").unwrap().turn_count, 0);
    assert_eq!(stored_sequence(&h, "alice"), None);

    assert_eq!(send(&h, "alice", "q3").await.unwrap(), "fresh");
    assert_eq!(h.hub.conversations_created(), 2);
    assert_eq!(h.hub.invocation_ids(), vec!["0", "1", "0"]);
}

#[tokio::test]
async fn engine_switch_discards_conversation() {
    let h = harness();
    h.hub.answer("from bing");
    send(&h, "alice", "hello").await.unwrap();

    let reply = send(&h, "alice", "/engine gpt-3.5-turbo").await.unwrap();
    assert!(reply.contains("[gpt-3.5-turbo]"));

    let info = send(&h, "alice", "/info").await.unwrap();
    assert!(info.contains("engine:gpt-3.5-turbo"));
    assert!(!info.contains("style:"));
    assert!(info.contains("turn_count:0"));

    assert_eq!(
        send(&h, "alice", "hi").await.unwrap(),
        "echo: hi (0 prior turns)"
    );
    assert_eq!(
        send(&h, "alice", "hi again").await.unwrap(),
        "echo: hi again (2 prior turns)"
    );

    let record = h.store().record("alice").unwrap();
    assert_eq!(record.engine, Engine::Gpt35Turbo);
    assert_eq!(record.turn_count, 2);
    assert!(matches!(record.state, Some(EngineState::Memory { ref turns }) if turns.len() == 4));
}

#[tokio::test]
async fn same_engine_switch_resets() {
    let h = harness();
    h.hub.answer("one");
    h.hub.answer("two");
    send(&h, "alice", "hello").await.unwrap();

    send(&h, "alice", "/engine bing").await.unwrap();
    assert_eq!(h.store().record("alice").unwrap().turn_count, 0);

    send(&h, "alice", "hello").await.unwrap();
    assert_eq!(h.hub.invocation_ids(), vec!["0", "0"]);
}

#[tokio::test]
async fn style_is_rejected_on_memory_engine() {
    let h = harness_with(MemoryStore::default(), Engine::Gpt35Turbo, BusyPolicy::Queue);
    let reply = send(&h, "alice", "/style creative").await.unwrap();
    assert_eq!(
        reply,
        "[WARN] the gpt-3.5-turbo engine does not support conversation styles"
    );
}

#[tokio::test]
async fn style_reaches_next_request() {
    let h = harness();
    h.hub.answer("precise answer");

    send(&h, "alice", "/style precise").await.unwrap();
    send(&h, "alice", "question").await.unwrap();

    let requests = h.hub.requests.lock().unwrap();
    let options: Vec<String> =
        serde_json::from_value(requests[0]["arguments"][0]["optionsSets"].clone()).unwrap();
    assert!(options.contains(&"h3precise".to_string()));
    drop(requests);

    let info = send(&h, "alice", "/info").await.unwrap();
    assert!(info.contains("style:precise"));
}

#[tokio::test]
async fn session_resumes_after_restart() {
    let first = harness();
    first.hub.answer("before restart");
    send(&first, "alice", "hello").await.unwrap();
    let record = first.store().record("alice").unwrap();

    let store = MemoryStore::default();
    store.put(&record).await.unwrap();
    let second = harness_with(store, Engine::Bing, BusyPolicy::Queue);
    second.hub.answer("after restart");

    assert_eq!(send(&second, "alice", "hello again").await.unwrap(), "after restart");
    assert_eq!(second.hub.conversations_created(), 0);
    assert_eq!(second.hub.invocation_ids(), vec!["1"]);
    assert_eq!(second.store().record("alice").unwrap().turn_count, 2);
}

#[tokio::test]
async fn busy_session_is_rejected_under_reject_policy() {
    let h = harness_with(MemoryStore::default(), Engine::Bing, BusyPolicy::Reject);
    let _guard = h.registry.acquire("alice").await.unwrap();

    let err = h
        .dispatcher
        .handle(&InboundMessage::direct("alice", "hello"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::SessionBusy(key) if key == "alice"));

    // Other sessions are unaffected.
    assert!(send(&h, "bob", "/info").await.is_some());
}

#[tokio::test]
async fn sessions_are_isolated() {
    let h = harness();
    h.hub.answer("for alice");
    h.hub.answer("for bob");

    send(&h, "alice", "hi").await.unwrap();
    send(&h, "bob", "hi").await.unwrap();

    assert_eq!(stored_sequence(&h, "alice"), Some(1));
    assert_eq!(stored_sequence(&h, "bob"), Some(1));
    assert_eq!(h.hub.conversations_created(), 2);
}

#[tokio::test]
async fn shutdown_flushes_store() {
    let h = harness();
    send(&h, "alice", "/reset").await.unwrap();
    assert_eq!(h.registry.live_count(), 1);

    h.registry.shutdown().await.unwrap();
    assert_eq!(h.registry.live_count(), 0);
    assert_eq!(
        h.store().flushes.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn evict_removes_live_and_stored_session() {
    let h = harness();
    send(&h, "alice", "/reset").await.unwrap();

    assert!(h.registry.evict("alice").await.unwrap());
    assert!(h.store().record("alice").is_none());
    assert_eq!(h.registry.live_count(), 0);
    assert!(!h.registry.evict("alice").await.unwrap());
}

#[tokio::test]
async fn overlapping_prompts_queue_on_one_session() {
    let h = harness();
    h.hub.answer("first answer");
    h.hub.answer("second answer");

    let (a, b) = tokio::join!(send(&h, "alice", "one"), send(&h, "alice", "two"));
    let mut replies = vec![a.unwrap(), b.unwrap()];
    replies.sort();
    assert_eq!(replies, vec!["first answer", "second answer"]);

    assert_eq!(h.hub.invocation_ids(), vec!["0", "1"]);
    assert_eq!(h.hub.conversations_created(), 1);
    assert_eq!(stored_sequence(&h, "alice"), Some(2));
    assert_eq!(h.registry.live_count(), 1);
}

#[tokio::test]
async fn evict_waits_for_in_flight_work_and_leaves_one_bot() {
    let h = harness();
    send(&h, "alice", "/reset").await.unwrap();

    let held = h.registry.get_or_create("alice").await.unwrap();
    let guard = std::sync::Arc::clone(&held).lock_owned().await;

    let registry = std::sync::Arc::clone(&h.registry);
    let eviction = tokio::spawn(async move { registry.evict("alice").await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!eviction.is_finished());

    // Lookups during the eviction still resolve to the bot being evicted.
    let during = h.registry.get_or_create("alice").await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&held, &during));

    // A write from the in-flight message lands before the delete.
    h.registry.persist(&guard).await.unwrap();
    drop(guard);

    assert!(eviction.await.unwrap().unwrap());
    assert!(h.store().record("alice").is_none());
    assert_eq!(h.registry.live_count(), 0);

    let fresh = h.registry.acquire("alice").await.unwrap();
    assert_eq!(fresh.turn_count(), 0);
    drop(fresh);
    let current = h.registry.get_or_create("alice").await.unwrap();
    assert!(!std::sync::Arc::ptr_eq(&held, &current));
    assert_eq!(h.registry.live_count(), 1);
}

#[tokio::test]
async fn waiter_on_evicted_bot_gets_the_replacement() {
    let h = harness();
    send(&h, "alice", "/reset").await.unwrap();
    let held = h.registry.get_or_create("alice").await.unwrap();
    let guard = std::sync::Arc::clone(&held).lock_owned().await;

    let registry = std::sync::Arc::clone(&h.registry);
    let eviction = tokio::spawn(async move { registry.evict("alice").await });
    let registry = std::sync::Arc::clone(&h.registry);
    let waiter = tokio::spawn(async move {
        let bot = registry.acquire("alice").await.unwrap();
        bot.session_key().to_string()
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    drop(guard);
    eviction.await.unwrap().unwrap();
    assert_eq!(waiter.await.unwrap(), "alice");

    let current = h.registry.get_or_create("alice").await.unwrap();
    assert!(!std::sync::Arc::ptr_eq(&held, &current));
    assert_eq!(h.registry.live_count(), 1);
}
