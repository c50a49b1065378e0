// Test mocks for the dashboard coordinators.
//
// Three mocks matching the three trait boundaries:
// - MockQueryBackend (QueryBackend): scripted replies, records every request
// - MockCaseSource (CaseSource): HashMap-based id→case, optional per-id gates
// - MockSignalSource (SignalSource): scripted signal snapshots
//
// Gates hold a call open until the test releases it, which is how tests
// observe in-flight state without sleeping.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use vigil_client::{AiQueryRequest, AiQueryResponse};
use vigil_common::types::{
    Action, ActionKind, CaseDetail, QueryConfirmation, Severity, SignalSummary, SimilarCase,
    Trend,
};

use crate::traits::{CaseSource, QueryBackend, SignalSource};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A critical, increasing signal with PRR 15.3 over 234 cases.
pub fn signal(id: &str, rank: u32, drug: &str, reaction: &str) -> SignalSummary {
    SignalSummary {
        id: id.to_string(),
        rank,
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        prr: 15.3,
        cases: 234,
        ai_score: 0.92,
        trend: Trend::Increasing,
        severity: Severity::Critical,
    }
}

/// A case with every optional field absent.
pub fn bare_case(id: &str, drug: &str, reaction: &str) -> CaseDetail {
    CaseDetail {
        id: id.to_string(),
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        outcome: None,
        age: None,
        sex: None,
        serious: false,
        report_date: None,
        narrative: None,
    }
}

pub fn plain_reply(message: &str) -> AiQueryResponse {
    AiQueryResponse {
        message: message.to_string(),
        actions: Vec::new(),
        confirmation: None,
        requires_confirmation: false,
    }
}

/// A reply asking the user to confirm an interpreted filter.
pub fn confirmation_reply(message: &str, description: &str, estimated: u64) -> AiQueryResponse {
    AiQueryResponse {
        message: message.to_string(),
        actions: vec![
            Action {
                id: "confirm".to_string(),
                label: "Confirm".to_string(),
                kind: ActionKind::Confirm,
            },
            Action {
                id: "adjust".to_string(),
                label: "Adjust filters".to_string(),
                kind: ActionKind::AdjustFilters,
            },
        ],
        confirmation: Some(QueryConfirmation {
            description: description.to_string(),
            estimated_count: Some(estimated),
            filters: serde_json::Value::Null,
        }),
        requires_confirmation: true,
    }
}

// ---------------------------------------------------------------------------
// MockQueryBackend
// ---------------------------------------------------------------------------

/// Scripted query backend. Replies are consumed in order; once exhausted it
/// answers "ok". Builder pattern: `.reply()`, `.reply_with()`, `.fail()`, `.gated()`.
pub struct MockQueryBackend {
    script: Mutex<VecDeque<std::result::Result<AiQueryResponse, String>>>,
    requests: Mutex<Vec<AiQueryRequest>>,
    gate: Option<Arc<Notify>>,
}

impl Default for MockQueryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQueryBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn reply(self, message: &str) -> Self {
        self.reply_with(plain_reply(message))
    }

    pub fn reply_with(self, response: AiQueryResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, error: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(error.to_string()));
        self
    }

    /// Hold every call open until `release()`.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held call through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<AiQueryRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<AiQueryRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl QueryBackend for MockQueryBackend {
    async fn ai_query(&self, request: AiQueryRequest) -> Result<AiQueryResponse> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(plain_reply("ok")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCaseSource
// ---------------------------------------------------------------------------

/// HashMap-based case source. Returns `Err` for unregistered ids.
/// Builder pattern: `.on_case()`, `.on_similar()`, `.on_similar_error()`, `.gate()`.
pub struct MockCaseSource {
    cases: HashMap<String, CaseDetail>,
    similar: HashMap<String, Vec<SimilarCase>>,
    similar_errors: HashMap<String, String>,
    gates: HashMap<String, Arc<Notify>>,
    case_calls: AtomicUsize,
    completed: AtomicUsize,
}

impl Default for MockCaseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaseSource {
    pub fn new() -> Self {
        Self {
            cases: HashMap::new(),
            similar: HashMap::new(),
            similar_errors: HashMap::new(),
            gates: HashMap::new(),
            case_calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn on_case(mut self, case: CaseDetail) -> Self {
        self.cases.insert(case.id.clone(), case);
        self
    }

    pub fn on_similar(mut self, case_id: &str, similar: Vec<SimilarCase>) -> Self {
        self.similar.insert(case_id.to_string(), similar);
        self
    }

    pub fn on_similar_error(mut self, case_id: &str, error: &str) -> Self {
        self.similar_errors
            .insert(case_id.to_string(), error.to_string());
        self
    }

    /// Hold `case(case_id)` open until `release(case_id)`.
    pub fn gate(mut self, case_id: &str) -> Self {
        self.gates
            .insert(case_id.to_string(), Arc::new(Notify::new()));
        self
    }

    pub fn release(&self, case_id: &str) {
        if let Some(gate) = self.gates.get(case_id) {
            gate.notify_one();
        }
    }

    /// Number of `case()` calls started.
    pub fn case_calls(&self) -> usize {
        self.case_calls.load(Ordering::SeqCst)
    }

    /// Number of `case()` calls that got past their gate.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseSource for MockCaseSource {
    async fn case(&self, case_id: &str) -> Result<CaseDetail> {
        self.case_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(case_id) {
            gate.notified().await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.cases
            .get(case_id)
            .cloned()
            .ok_or_else(|| anyhow!("case {case_id} not found"))
    }

    async fn similar_cases(&self, case_id: &str) -> Result<Vec<SimilarCase>> {
        if let Some(error) = self.similar_errors.get(case_id) {
            return Err(anyhow!("{error}"));
        }
        Ok(self.similar.get(case_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockSignalSource
// ---------------------------------------------------------------------------

/// Serves scripted snapshots in order, repeating the last one when exhausted.
pub struct MockSignalSource {
    snapshots: Mutex<VecDeque<std::result::Result<Vec<SignalSummary>, String>>>,
    last: Mutex<Vec<SignalSummary>>,
}

impl Default for MockSignalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSignalSource {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::new()),
            last: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(self, signals: Vec<SignalSummary>) -> Self {
        self.snapshots.lock().unwrap().push_back(Ok(signals));
        self
    }

    pub fn failing(self, error: &str) -> Self {
        self.snapshots
            .lock()
            .unwrap()
            .push_back(Err(error.to_string()));
        self
    }
}

#[async_trait]
impl SignalSource for MockSignalSource {
    async fn ranked_signals(&self, _threshold: f64, limit: u32) -> Result<Vec<SignalSummary>> {
        let next = self.snapshots.lock().unwrap().pop_front();
        match next {
            Some(Ok(signals)) => {
                *self.last.lock().unwrap() = signals.clone();
                Ok(signals.into_iter().take(limit as usize).collect())
            }
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(self
                .last
                .lock()
                .unwrap()
                .iter()
                .take(limit as usize)
                .cloned()
                .collect()),
        }
    }
}
