use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use vigil_common::types::{
    Action, CaseDetail, QueryConfirmation, SessionInfo, Severity, SignalSummary, SimilarCase,
    Trend, UploadRecord,
};

// --- AI query ---

/// Body for `POST /ai/query`.
#[derive(Debug, Clone, PartialEq, Serialize, TypedBuilder)]
pub struct AiQueryRequest {
    #[builder(setter(into))]
    pub query: String,
    #[builder(setter(into))]
    pub session_id: String,
    #[builder(default)]
    pub refinement_mode: bool,
    #[builder(default)]
    pub reset_context: bool,
    #[builder(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiQueryResponse {
    pub message: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub confirmation: Option<QueryConfirmation>,
    #[serde(default)]
    pub requires_confirmation: bool,
}

// --- Statistical signals ---

/// One row of `GET /signals/statistical`, already ranked by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatisticalSignal {
    #[serde(default)]
    pub id: Option<String>,
    pub drug: String,
    pub reaction: String,
    pub prr: f64,
    #[serde(default)]
    pub ror: Option<f64>,
    #[serde(default)]
    pub ic: Option<f64>,
    pub cases: u64,
    #[serde(default)]
    pub ai_score: Option<f64>,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// PRR at or above which an unlabelled signal counts as critical.
const CRITICAL_PRR: f64 = 10.0;
/// PRR at or above which an unlabelled signal counts as high.
const HIGH_PRR: f64 = 5.0;

impl StatisticalSignal {
    /// Convert to the card model. `rank` is 1-based list position.
    pub fn into_summary(self, rank: u32) -> SignalSummary {
        let severity = self.severity.unwrap_or(if self.prr >= CRITICAL_PRR {
            Severity::Critical
        } else if self.prr >= HIGH_PRR {
            Severity::High
        } else {
            Severity::Medium
        });
        let id = self
            .id
            .unwrap_or_else(|| SignalSummary::pair_key(&self.drug, &self.reaction));

        SignalSummary {
            id,
            rank,
            drug: self.drug,
            reaction: self.reaction,
            prr: self.prr,
            cases: self.cases,
            ai_score: self.ai_score.unwrap_or(0.0).clamp(0.0, 1.0),
            trend: self.trend.unwrap_or(Trend::Stable),
            severity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticalSignalsResponse {
    pub signals: Vec<StatisticalSignal>,
}

// --- List wrappers ---

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarCasesResponse {
    pub similar_cases: Vec<SimilarCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadHistoryResponse {
    pub uploads: Vec<UploadRecord>,
}

/// Wrapper so `GET /cases/{id}` may answer either bare or as `{ "case": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CasePayload {
    Wrapped { case: CaseDetail },
    Bare(CaseDetail),
}

impl CasePayload {
    pub(crate) fn into_inner(self) -> CaseDetail {
        match self {
            CasePayload::Wrapped { case } => case,
            CasePayload::Bare(case) => case,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MergeResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(prr: f64) -> StatisticalSignal {
        StatisticalSignal {
            id: None,
            drug: "Aspirin".to_string(),
            reaction: "GI bleeding".to_string(),
            prr,
            ror: Some(16.1),
            ic: Some(3.2),
            cases: 234,
            ai_score: None,
            trend: None,
            severity: None,
        }
    }

    #[test]
    fn severity_derived_from_prr_when_absent() {
        assert_eq!(raw(15.3).into_summary(1).severity, Severity::Critical);
        assert_eq!(raw(6.0).into_summary(1).severity, Severity::High);
        assert_eq!(raw(2.1).into_summary(1).severity, Severity::Medium);
    }

    #[test]
    fn explicit_severity_wins() {
        let mut s = raw(15.3);
        s.severity = Some(Severity::Medium);
        assert_eq!(s.into_summary(1).severity, Severity::Medium);
    }

    #[test]
    fn summary_defaults() {
        let summary = raw(15.3).into_summary(4);
        assert_eq!(summary.rank, 4);
        assert_eq!(summary.id, "aspirin::gi bleeding");
        assert_eq!(summary.trend, Trend::Stable);
        assert_eq!(summary.ai_score, 0.0);
    }

    #[test]
    fn ai_score_is_clamped() {
        let mut s = raw(3.0);
        s.ai_score = Some(1.7);
        assert_eq!(s.into_summary(1).ai_score, 1.0);
    }

    #[test]
    fn query_request_builder_defaults_flags_off() {
        let req = AiQueryRequest::builder()
            .query("Show bleeding cases for Aspirin")
            .session_id("s-1")
            .build();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "query": "Show bleeding cases for Aspirin",
                "session_id": "s-1",
                "refinement_mode": false,
                "reset_context": false,
                "confirmed": false
            })
        );
    }

    #[test]
    fn case_payload_accepts_both_shapes() {
        let bare: CasePayload =
            serde_json::from_value(json!({"id": "c1", "drug": "A", "reaction": "B"})).unwrap();
        let wrapped: CasePayload = serde_json::from_value(
            json!({"case": {"id": "c1", "drug": "A", "reaction": "B"}}),
        )
        .unwrap();
        assert_eq!(bare.into_inner(), wrapped.into_inner());
    }
}
