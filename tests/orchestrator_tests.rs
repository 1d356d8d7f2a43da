//! Orchestrator integration tests
//!
//! Drives turns through the public API against a temp-file ledger and the
//! scripted mock provider.

mod common;

use std::fs;
use std::sync::Arc;

use backrooms::ledger::{LedgerStore, UsageRecord};
use backrooms::orchestrator::{SessionId, SessionState, Trigger, TurnOutcome};
use backrooms::persona::{Persona, PersonaRotation};
use backrooms::provider::{MockConfig, MockProvider, MockReply};
use backrooms::types::Role;

use common::{today, Harness};

// ─────────────────────────────────────────────────────────────────
// Persona Rotation
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_persona_for_turn_wraps() {
    let personas: Vec<Persona> = (0..3)
        .map(|i| Persona::new(format!("P{}", i), format!("m{}", i), "prompt"))
        .collect();
    let rotation = PersonaRotation::new(personas.clone()).unwrap();

    for turn in 0..50u64 {
        assert_eq!(rotation.persona_for_turn(turn), &personas[(turn % 3) as usize]);
    }
    assert_eq!(rotation.persona_for_turn(u64::MAX), &personas[(u64::MAX % 3) as usize]);
}

#[test]
fn test_empty_rotation_is_rejected() {
    assert!(PersonaRotation::new(Vec::new()).is_err());
}

// ─────────────────────────────────────────────────────────────────
// Usage Ledger
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_ledger_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = LedgerStore::new(dir.path().join("usage.json"));

    store.write(4, today()).unwrap();
    assert_eq!(store.read(today()), UsageRecord::new(4, today()));
}

#[test]
fn test_yesterdays_record_reads_zero_without_rewrite() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("usage.json");
    fs::write(&path, r#"{"count":17,"date":"2024-06-14"}"#).unwrap();

    let store = LedgerStore::new(&path);
    assert_eq!(store.read(today()).count, 0);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        r#"{"count":17,"date":"2024-06-14"}"#
    );
}

#[test]
fn test_corrupt_ledger_fails_open() {
    let h = Harness::new(5, MockProvider::new());
    fs::write(h.ledger_path(), "{not json").unwrap();
    assert_eq!(h.count(), 0);
}

// ─────────────────────────────────────────────────────────────────
// Turn Outcomes
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_limit_reached_changes_nothing() {
    let h = Harness::with_count(5, 5, MockProvider::new());
    let mut state = SessionState::new();

    let outcome = h.orchestrator.turns().advance_turn(&mut state).await;

    assert!(matches!(outcome, TurnOutcome::LimitReached(_)));
    assert!(outcome.event().is_system());
    assert!(outcome.event().text.contains("Daily API limit reached (5 calls)"));
    assert_eq!(h.count(), 5);
    assert_eq!(state.turn_index, 0);
    assert!(state.transcript.is_empty());
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn test_success_path() {
    let mock = MockProvider::new().script([MockReply::Text("Hello from A".into())]);
    let h = Harness::with_count(20, 5, mock);
    let mut state = SessionState::new();

    let outcome = h.orchestrator.turns().advance_turn(&mut state).await;

    assert!(outcome.is_produced());
    assert_eq!(outcome.event().speaker, "A");
    assert_eq!(outcome.event().text, "Hello from A");
    assert_eq!(h.count(), 6);
    assert_eq!(state.turn_index, 1);
    assert_eq!(state.transcript.len(), 1);
}

#[tokio::test]
async fn test_failure_path_rolls_back() {
    let h = Harness::with_count(20, 5, MockProvider::failing());
    let mut state = SessionState::new();

    let outcome = h.orchestrator.turns().advance_turn(&mut state).await;

    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert!(outcome.event().is_error());
    assert_eq!(h.count(), 5);
    assert_eq!(state.turn_index, 0);
    assert!(state.transcript.is_empty());
    assert_eq!(h.provider.call_count(), 1);
}

#[tokio::test]
async fn test_failure_notice_hides_provider_details() {
    let mock = MockProvider::new().script([MockReply::Fail("secret upstream detail".into())]);
    let h = Harness::new(20, mock);

    let event = h.trigger(SessionId::new(), Trigger::Start).await;
    assert!(!event.text.contains("secret upstream detail"));
}

#[tokio::test]
async fn test_context_replays_every_persona() {
    let h = Harness::new(20, MockProvider::new());
    let id = SessionId::new();

    for _ in 0..3 {
        h.trigger(id, Trigger::Advance).await;
    }

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 3);

    // Third turn is A again, conditioned on A's and B's replies
    let third = &calls[2];
    assert_eq!(third.model_id, "model-a");
    assert_eq!(third.messages.len(), 3);
    assert_eq!(third.messages[0].role, Role::System);
    assert_eq!(third.messages[0].content, "You are A.");
    assert!(third.messages[1..].iter().all(|m| m.role == Role::Assistant));
    assert!(third.messages[2].content.contains("model-b"));
}

// ─────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_two_personas_limit_two() {
    let h = Harness::new(2, MockProvider::new());
    let id = SessionId::new();

    let first = h.trigger(id, Trigger::Start).await;
    assert_eq!(first.speaker, "A");
    assert_eq!(h.count(), 1);

    let second = h.trigger(id, Trigger::Advance).await;
    assert_eq!(second.speaker, "B");
    assert_eq!(h.count(), 2);

    let third = h.trigger(id, Trigger::Advance).await;
    assert!(third.is_system());
    assert!(third.text.contains("limit"));
    assert_eq!(h.count(), 2);
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn test_sessions_share_budget_not_transcripts() {
    let h = Harness::new(3, MockProvider::new());
    let a = SessionId::new();
    let b = SessionId::new();

    h.trigger(a, Trigger::Start).await;
    h.trigger(a, Trigger::Advance).await;

    // b starts from its own turn 0 with an empty transcript
    let event = h.trigger(b, Trigger::Start).await;
    assert_eq!(event.speaker, "A");
    assert_eq!(h.provider.last_call().unwrap().messages.len(), 1);

    // but the budget is already gone for both
    assert!(h.trigger(a, Trigger::Advance).await.is_system());
    assert!(h.trigger(b, Trigger::Advance).await.is_system());
    assert_eq!(h.count(), 3);
}

#[tokio::test]
async fn test_overlapping_triggers_on_one_session_queue() {
    let mock = MockProvider::with_config(MockConfig {
        latency_ms: 50,
        ..Default::default()
    });
    let h = Harness::new(10, mock);
    let id = SessionId::new();

    let first = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move {
            let session = orchestrator.session(id);
            orchestrator.trigger(&session, Trigger::Start).await
        })
    };
    let second = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move {
            let session = orchestrator.session(id);
            orchestrator.trigger(&session, Trigger::Advance).await
        })
    };

    let mut speakers = vec![
        first.await.unwrap().unwrap().speaker,
        second.await.unwrap().unwrap().speaker,
    ];
    speakers.sort();
    assert_eq!(speakers, vec!["A", "B"]);

    let handle = h.orchestrator.sessions().get(id).unwrap();
    let state = handle.lock().await;
    assert_eq!(state.turn_index, 2);
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(h.count(), 2);
}

#[tokio::test]
async fn test_concurrent_sessions_never_exceed_limit() {
    let h = Harness::new(5, MockProvider::new());

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move {
                let session = orchestrator.session(SessionId::new());
                orchestrator.trigger(&session, Trigger::Start).await
            })
        })
        .collect();

    let mut produced = 0;
    for task in tasks {
        if !task.await.unwrap().unwrap().is_system() {
            produced += 1;
        }
    }

    assert_eq!(produced, 5);
    assert_eq!(h.count(), 5);
    assert_eq!(h.provider.call_count(), 5);
}

#[test]
fn test_open_session_greets_with_status() {
    let h = Harness::with_count(20, 3, MockProvider::new());
    let session = h.orchestrator.open_session();

    assert_eq!(session.status.speaker, "System");
    assert_eq!(session.status.text, "API calls today: 3/20");
    assert!(h.orchestrator.sessions().contains(session.id));
    assert_eq!(h.count(), 3);

    h.orchestrator.close_session(session.id);
    assert!(h.orchestrator.sessions().is_empty());
}

#[tokio::test]
async fn test_closed_session_skips_queued_triggers() {
    let mock = MockProvider::with_config(MockConfig {
        latency_ms: 100,
        ..Default::default()
    });
    let h = Harness::new(20, mock);
    let session = h.orchestrator.open_session();

    let in_flight = {
        let orchestrator = h.orchestrator.clone();
        let handle = session.handle.clone();
        tokio::spawn(async move { orchestrator.trigger(&handle, Trigger::Start).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let queued: Vec<_> = (0..3)
        .map(|_| {
            let orchestrator = h.orchestrator.clone();
            let handle = session.handle.clone();
            tokio::spawn(async move { orchestrator.trigger(&handle, Trigger::Advance).await })
        })
        .collect();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    h.orchestrator.close_session(session.id);

    // The call already at the provider finishes; the rest never start
    assert_eq!(in_flight.await.unwrap().unwrap().speaker, "A");
    for task in queued {
        assert!(task.await.unwrap().is_none());
    }
    assert_eq!(h.provider.call_count(), 1);
    assert_eq!(h.count(), 1);
    assert!(h.orchestrator.sessions().is_empty());
}

#[test]
fn test_failed_turn_retries_same_persona() {
    let mock = MockProvider::new().script([
        MockReply::Fail("timeout".into()),
        MockReply::Text("second try".into()),
    ]);
    let h = Harness::new(10, mock);
    let orchestrator = Arc::clone(&h.orchestrator);
    let session = orchestrator.session(SessionId::new());

    let (failed, retried) = tokio_test::block_on(async {
        let failed = orchestrator.trigger(&session, Trigger::Start).await.unwrap();
        let retried = orchestrator.trigger(&session, Trigger::Advance).await.unwrap();
        (failed, retried)
    });

    assert!(failed.is_error());
    assert_eq!(retried.speaker, "A");
    assert_eq!(retried.text, "second try");
    assert_eq!(h.count(), 1);
}

#[tokio::test]
async fn test_new_day_restores_budget() {
    let h = Harness::new(1, MockProvider::new());
    let id = SessionId::new();

    assert_eq!(h.trigger(id, Trigger::Start).await.speaker, "A");
    assert!(h.trigger(id, Trigger::Advance).await.is_system());

    h.clock.advance_days(1);
    assert_eq!(h.trigger(id, Trigger::Advance).await.speaker, "B");
    assert_eq!(h.ledger.read(), UsageRecord::new(1, h.ledger.today()));
}

// ─────────────────────────────────────────────────────────────────
// Storage Failures
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unwritable_ledger_still_produces_turns() {
    let mock = MockProvider::new().script([
        MockReply::Text("still talking".into()),
        MockReply::Text("and again".into()),
    ]);
    let h = Harness::unwritable(20, mock);
    let id = SessionId::new();

    let first = h.trigger(id, Trigger::Start).await;
    assert_eq!(first.speaker, "A");
    assert_eq!(first.text, "still talking");

    let second = h.trigger(id, Trigger::Advance).await;
    assert_eq!(second.speaker, "B");

    // Charges never landed, so the ledger still reads zero
    assert_eq!(h.count(), 0);
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn test_unwritable_ledger_failure_emits_one_error() {
    let h = Harness::unwritable(20, MockProvider::failing());
    let session = h.orchestrator.session(SessionId::new());

    let outcome = {
        let mut state = session.lock().await;
        h.orchestrator.turns().advance_turn(&mut state).await
    };

    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert!(outcome.event().is_error());
    assert_eq!(h.count(), 0);

    let state = session.lock().await;
    assert_eq!(state.turn_index, 0);
    assert!(state.transcript.is_empty());
}
