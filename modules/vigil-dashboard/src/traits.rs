// Trait seams between the coordinators and the signal backend.
//
// QueryBackend: natural-language query interpretation and execution.
// CaseSource: case detail and similarity lookups.
// SignalSource: ranked statistical signals.
//
// VigilClient implements all three. Tests swap in the mocks from `testing`.

use anyhow::Result;
use async_trait::async_trait;

use vigil_client::{AiQueryRequest, AiQueryResponse, VigilClient};
use vigil_common::types::{CaseDetail, SignalSummary, SimilarCase};

#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn ai_query(&self, request: AiQueryRequest) -> Result<AiQueryResponse>;
}

#[async_trait]
pub trait CaseSource: Send + Sync {
    async fn case(&self, case_id: &str) -> Result<CaseDetail>;

    async fn similar_cases(&self, case_id: &str) -> Result<Vec<SimilarCase>>;
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Signals above `threshold`, at most `limit`, ranked from 1.
    async fn ranked_signals(&self, threshold: f64, limit: u32) -> Result<Vec<SignalSummary>>;
}

#[async_trait]
impl QueryBackend for VigilClient {
    async fn ai_query(&self, request: AiQueryRequest) -> Result<AiQueryResponse> {
        Ok(VigilClient::ai_query(self, &request).await?)
    }
}

#[async_trait]
impl CaseSource for VigilClient {
    async fn case(&self, case_id: &str) -> Result<CaseDetail> {
        Ok(VigilClient::case(self, case_id).await?)
    }

    async fn similar_cases(&self, case_id: &str) -> Result<Vec<SimilarCase>> {
        Ok(VigilClient::similar_cases(self, case_id).await?)
    }
}

#[async_trait]
impl SignalSource for VigilClient {
    async fn ranked_signals(&self, threshold: f64, limit: u32) -> Result<Vec<SignalSummary>> {
        Ok(VigilClient::ranked_signals(self, threshold, limit).await?)
    }
}
