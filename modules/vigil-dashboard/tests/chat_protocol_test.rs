//! Chat round-trip protocol tests.
//!
//! These pin the request contract with the query backend:
//! - at most one request in flight per panel
//! - reset_context is sent exactly once after being armed
//! - confirmation re-sends the original query in the same session, under
//!   the refinement mode it was interpreted with

use std::sync::Arc;

use vigil_common::types::{ActionKind, ChatRole};
use vigil_dashboard::chat::PendingConfirmation;
use vigil_dashboard::testing::{confirmation_reply, MockQueryBackend};
use vigil_dashboard::{ChatPanel, ChatPhase, IgnoreReason, SubmitOutcome};

async fn wait_for_calls(backend: &MockQueryBackend, n: usize) {
    while backend.calls() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn concurrent_submit_is_collapsed() {
    let backend = Arc::new(MockQueryBackend::new().reply("first answer").gated());
    let chat = Arc::new(ChatPanel::with_session_id(backend.clone(), "sess-1"));

    let first = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.submit("first").await })
    };
    wait_for_calls(&backend, 1).await;
    assert_eq!(chat.phase(), ChatPhase::Sending);

    assert_eq!(
        chat.submit("second").await,
        SubmitOutcome::Ignored(IgnoreReason::Busy)
    );
    assert_eq!(chat.confirm().await, SubmitOutcome::Ignored(IgnoreReason::Busy));
    assert_eq!(backend.calls(), 1);

    backend.release();
    assert_eq!(first.await.unwrap(), SubmitOutcome::Answered);

    let transcript = chat.transcript();
    let texts: Vec<_> = transcript.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "first answer"]);
    assert_eq!(chat.phase(), ChatPhase::Idle);

    // Once idle, the next submit goes through.
    backend.release();
    assert_eq!(chat.submit("third").await, SubmitOutcome::Answered);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn user_message_is_visible_while_sending() {
    let backend = Arc::new(MockQueryBackend::new().gated());
    let chat = Arc::new(ChatPanel::with_session_id(backend.clone(), "sess-1"));

    let pending = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.submit("Show bleeding cases for Aspirin").await })
    };
    wait_for_calls(&backend, 1).await;

    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, ChatRole::User);

    backend.release();
    pending.await.unwrap();
    assert_eq!(chat.transcript().len(), 2);
}

#[tokio::test]
async fn reset_context_is_one_shot() {
    let backend = Arc::new(MockQueryBackend::new());
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");
    chat.set_refinement_mode(true);

    chat.reset_context();
    assert!(chat.reset_armed());
    chat.submit("fresh question").await;
    chat.submit("follow-up").await;

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].reset_context);
    assert!(!requests[0].refinement_mode);
    assert!(!requests[1].reset_context);
    assert!(!requests[1].refinement_mode);
    assert!(!chat.reset_armed());
    assert!(!chat.refinement_mode());
}

#[tokio::test]
async fn refinement_mode_is_carried_until_changed() {
    let backend = Arc::new(MockQueryBackend::new());
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");

    chat.submit("base query").await;
    chat.set_refinement_mode(true);
    chat.submit("only serious ones").await;

    let requests = backend.requests();
    assert!(!requests[0].refinement_mode);
    assert!(requests[1].refinement_mode);
    assert!(!requests[1].reset_context);
}

#[tokio::test]
async fn reset_survives_a_blank_submit() {
    let backend = Arc::new(MockQueryBackend::new());
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");

    chat.reset_context();
    chat.submit("   ").await;
    chat.submit("real question").await;

    assert_eq!(backend.calls(), 1);
    assert!(backend.last_request().unwrap().reset_context);
}

#[tokio::test]
async fn confirmation_reuses_session() {
    let backend = Arc::new(
        MockQueryBackend::new()
            .reply_with(confirmation_reply(
                "I'll search Aspirin cases with bleeding reactions.",
                "drug = Aspirin AND reaction ~ bleeding",
                234,
            ))
            .reply("Found 234 cases."),
    );
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-77");

    assert_eq!(
        chat.submit("Show bleeding cases for Aspirin").await,
        SubmitOutcome::Answered
    );
    let pending = chat.pending_confirmation().unwrap();
    assert_eq!(
        pending,
        PendingConfirmation {
            query: "Show bleeding cases for Aspirin".to_string(),
            confirmation: chat.transcript()[1].confirmation.clone(),
            refinement_mode: false,
        }
    );

    let confirm = chat.transcript()[1]
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::Confirm)
        .cloned()
        .unwrap();
    assert_eq!(
        chat.trigger_action(&confirm).await,
        Some(SubmitOutcome::Answered)
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].confirmed);
    assert!(requests[1].confirmed);
    assert_eq!(requests[1].session_id, "sess-77");
    assert_eq!(requests[1].session_id, requests[0].session_id);
    assert_eq!(requests[1].query, requests[0].query);

    assert!(chat.pending_confirmation().is_none());
    assert_eq!(chat.transcript().last().unwrap().text, "Found 234 cases.");
}

#[tokio::test]
async fn new_query_drops_stale_confirmation() {
    let backend = Arc::new(
        MockQueryBackend::new()
            .reply_with(confirmation_reply("Interpreted.", "drug = Aspirin", 10))
            .reply("Something else."),
    );
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");

    chat.submit("Aspirin cases").await;
    assert!(chat.pending_confirmation().is_some());
    chat.submit("never mind, show trends").await;

    assert!(chat.pending_confirmation().is_none());
    assert_eq!(
        chat.confirm().await,
        SubmitOutcome::Ignored(IgnoreReason::NothingToConfirm)
    );
}

#[tokio::test]
async fn failed_confirmation_stays_pending_for_retry() {
    let backend = Arc::new(
        MockQueryBackend::new()
            .reply_with(confirmation_reply("Interpreted.", "drug = Aspirin", 10))
            .fail("connection reset")
            .reply("Found 10 cases."),
    );
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");

    chat.submit("Aspirin cases").await;
    let pending = chat.pending_confirmation().unwrap();
    assert_eq!(chat.confirm().await, SubmitOutcome::Failed);
    assert_eq!(
        chat.transcript().last().unwrap().text,
        vigil_dashboard::chat::FALLBACK_REPLY
    );
    assert_eq!(chat.pending_confirmation(), Some(pending));

    assert_eq!(chat.confirm().await, SubmitOutcome::Answered);
    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[2].confirmed);
    assert_eq!(requests[2].query, "Aspirin cases");
    assert!(chat.pending_confirmation().is_none());
}

#[tokio::test]
async fn reset_during_failed_confirmation_discards_it() {
    let backend = Arc::new(
        MockQueryBackend::new()
            .reply_with(confirmation_reply("Interpreted.", "drug = Aspirin", 10))
            .fail("connection reset")
            .gated(),
    );
    let chat = Arc::new(ChatPanel::with_session_id(backend.clone(), "sess-1"));

    backend.release();
    chat.submit("Aspirin cases").await;

    let confirming = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.confirm().await })
    };
    wait_for_calls(&backend, 2).await;
    chat.reset_context();
    backend.release();

    assert_eq!(confirming.await.unwrap(), SubmitOutcome::Failed);
    assert!(chat.pending_confirmation().is_none());
    assert!(chat.reset_armed());
}

#[tokio::test]
async fn confirmation_keeps_interpretation_refinement_mode() {
    let backend = Arc::new(
        MockQueryBackend::new()
            .reply_with(confirmation_reply("Narrowed.", "serious = true", 4))
            .reply("Found 4 cases."),
    );
    let chat = ChatPanel::with_session_id(backend.clone(), "sess-1");

    chat.set_refinement_mode(true);
    chat.submit("only serious ones").await;
    assert!(chat.pending_confirmation().unwrap().refinement_mode);

    chat.set_refinement_mode(false);
    assert_eq!(chat.confirm().await, SubmitOutcome::Answered);

    let requests = backend.requests();
    assert!(requests[0].refinement_mode);
    assert!(requests[1].confirmed);
    assert!(requests[1].refinement_mode);
}

#[tokio::test]
async fn dropped_submit_returns_panel_to_idle() {
    let backend = Arc::new(MockQueryBackend::new().gated());
    let chat = Arc::new(ChatPanel::with_session_id(backend.clone(), "sess-1"));

    let task = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.submit("slow").await })
    };
    wait_for_calls(&backend, 1).await;
    task.abort();
    let _ = task.await;

    assert_eq!(chat.phase(), ChatPhase::Idle);
    backend.release();
    assert_eq!(chat.submit("again").await, SubmitOutcome::Answered);
    assert_eq!(backend.calls(), 2);
}
