//! Assistant chat panel.
//!
//! One query round trip at a time: `Idle -> Sending -> Idle`. A submit while
//! `Sending` is dropped, not queued, so replies always land in call order.
//! Transport failures become a fixed assistant message; nothing propagates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;
use vigil_client::{AiQueryRequest, AiQueryResponse};
use vigil_common::types::{Action, ActionKind, ChatMessage, QueryConfirmation};

use crate::traits::QueryBackend;

pub const FALLBACK_REPLY: &str = "Couldn't reach server. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    Busy,
    NothingToConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No request was issued and the transcript is unchanged.
    Ignored(IgnoreReason),
    Answered,
    /// The request failed and the fallback reply was appended.
    Failed,
}

/// A query the backend interpreted and is waiting to run.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub query: String,
    pub confirmation: Option<QueryConfirmation>,
    /// Refinement mode the query was interpreted under.
    pub refinement_mode: bool,
}

#[derive(Debug)]
struct ChatState {
    transcript: Vec<ChatMessage>,
    input: String,
    phase: ChatPhase,
    refinement_mode: bool,
    reset_armed: bool,
    pending: Option<PendingConfirmation>,
}

pub struct ChatPanel {
    backend: Arc<dyn QueryBackend>,
    session_id: String,
    state: Mutex<ChatState>,
}

/// Returns the panel to `Idle` however the round trip ends, including when
/// the submitting future is dropped mid-flight.
struct SendingGuard<'a> {
    state: &'a Mutex<ChatState>,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = ChatPhase::Idle;
    }
}

impl ChatPanel {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_session_id(backend, Uuid::new_v4().to_string())
    }

    pub fn with_session_id(backend: Arc<dyn QueryBackend>, session_id: impl Into<String>) -> Self {
        Self {
            backend,
            session_id: session_id.into(),
            state: Mutex::new(ChatState {
                transcript: Vec::new(),
                input: String::new(),
                phase: ChatPhase::Idle,
                refinement_mode: false,
                reset_armed: false,
                pending: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.state().transcript.clone()
    }

    pub fn phase(&self) -> ChatPhase {
        self.state().phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase() == ChatPhase::Sending
    }

    pub fn input(&self) -> String {
        self.state().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state().input = text.into();
    }

    pub fn refinement_mode(&self) -> bool {
        self.state().refinement_mode
    }

    pub fn set_refinement_mode(&self, enabled: bool) {
        self.state().refinement_mode = enabled;
    }

    /// Arm a one-shot context reset. The next request carries
    /// `reset_context: true`; the flag then clears and refinement turns off.
    pub fn reset_context(&self) {
        let mut state = self.state();
        state.reset_armed = true;
        state.pending = None;
    }

    pub fn reset_armed(&self) -> bool {
        self.state().reset_armed
    }

    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.state().pending.clone()
    }

    /// Submit the input buffer. The buffer is cleared only if the submit is accepted.
    pub async fn submit_input(&self) -> SubmitOutcome {
        let text = self.input();
        let outcome = self.submit(&text).await;
        if !matches!(outcome, SubmitOutcome::Ignored(_)) {
            let mut state = self.state();
            if state.input == text {
                state.input.clear();
            }
        }
        outcome
    }

    /// Send a new query. The user message is appended before the request goes out.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let query = text.trim();

        let request = {
            let mut state = self.state();
            if query.is_empty() {
                return SubmitOutcome::Ignored(IgnoreReason::Blank);
            }
            if state.phase == ChatPhase::Sending {
                tracing::debug!("Submit ignored: a query is already in flight");
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }

            let reset_context = std::mem::take(&mut state.reset_armed);
            if reset_context {
                state.refinement_mode = false;
            }

            state.transcript.push(ChatMessage::user(query));
            state.pending = None;
            state.phase = ChatPhase::Sending;

            AiQueryRequest::builder()
                .query(query)
                .session_id(self.session_id.clone())
                .refinement_mode(state.refinement_mode)
                .reset_context(reset_context)
                .build()
        };

        self.round_trip(request, None).await
    }

    /// Run the query the backend last asked to confirm, in the same session
    /// and under the refinement mode it was interpreted with. If the request
    /// fails the confirmation stays pending.
    pub async fn confirm(&self) -> SubmitOutcome {
        let (request, pending) = {
            let mut state = self.state();
            if state.phase == ChatPhase::Sending {
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            let Some(pending) = state.pending.take() else {
                return SubmitOutcome::Ignored(IgnoreReason::NothingToConfirm);
            };
            state.phase = ChatPhase::Sending;

            let request = AiQueryRequest::builder()
                .query(pending.query.clone())
                .session_id(self.session_id.clone())
                .refinement_mode(pending.refinement_mode)
                .confirmed(true)
                .build();
            (request, pending)
        };

        self.round_trip(request, Some(pending)).await
    }

    /// Handle a click on an assistant action. Confirm actions run the pending
    /// query; every other kind is left to the page.
    pub async fn trigger_action(&self, action: &Action) -> Option<SubmitOutcome> {
        match action.kind {
            ActionKind::Confirm => Some(self.confirm().await),
            _ => None,
        }
    }

    async fn round_trip(
        &self,
        request: AiQueryRequest,
        confirming: Option<PendingConfirmation>,
    ) -> SubmitOutcome {
        let _sending = SendingGuard { state: &self.state };
        let query = request.query.clone();
        let confirmed = request.confirmed;
        let refinement_mode = request.refinement_mode;

        let result = self.backend.ai_query(request).await;

        let mut state = self.state();
        match result {
            Ok(response) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    confirmed,
                    requires_confirmation = response.requires_confirmation,
                    "Assistant replied"
                );
                if response.requires_confirmation && !confirmed {
                    state.pending = Some(PendingConfirmation {
                        query,
                        confirmation: response.confirmation.clone(),
                        refinement_mode,
                    });
                }
                state.transcript.push(assistant_message(response));
                SubmitOutcome::Answered
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Assistant query failed");
                state.transcript.push(ChatMessage::assistant(FALLBACK_REPLY));
                // A reset armed mid-flight discards the interpretation.
                if !state.reset_armed {
                    state.pending = state.pending.take().or(confirming);
                }
                SubmitOutcome::Failed
            }
        }
    }
}

fn assistant_message(response: AiQueryResponse) -> ChatMessage {
    ChatMessage::assistant(response.message)
        .with_actions(response.actions)
        .with_confirmation(response.confirmation)
}
