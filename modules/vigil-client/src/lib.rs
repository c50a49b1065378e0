pub mod error;
pub mod types;

pub use error::{ClientError, Result};
pub use types::{
    AiQueryRequest, AiQueryResponse, MergeResponse, StatisticalSignal,
    StatisticalSignalsResponse,
};

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;
use types::{CasePayload, SessionsResponse, SimilarCasesResponse, UploadHistoryResponse};
use vigil_common::types::{
    CaseDetail, ExportFormat, SessionInfo, SignalSummary, SimilarCase, UploadRecord,
};
use vigil_common::Config;

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Client for the signal backend's `/api/v1` REST surface.
#[derive(Clone)]
pub struct VigilClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl VigilClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Build a client honoring the configured base URL, token and timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(
            config.api_url.as_str(),
            config.api_token.as_deref(),
            config.request_timeout,
        )
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join path segments under the API prefix. Each segment is
    /// percent-encoded on its own, so ids can't add or climb path levels.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("base URL cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let builder = self.client.request(method, self.endpoint(segments)?);
        Ok(match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn ensure_success(resp: Response) -> Result<Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let resp = self.request(Method::GET, segments)?.send().await?;
        let resp = Self::ensure_success(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // --- AI query ---

    /// Interpret (or, with `confirmed`, execute) a natural-language query.
    pub async fn ai_query(&self, request: &AiQueryRequest) -> Result<AiQueryResponse> {
        tracing::debug!(
            session_id = %request.session_id,
            confirmed = request.confirmed,
            refinement_mode = request.refinement_mode,
            reset_context = request.reset_context,
            "AI query request"
        );

        let resp = self
            .request(Method::POST, &["ai", "query"])?
            .json(request)
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // --- Cases ---

    pub async fn case(&self, case_id: &str) -> Result<CaseDetail> {
        let payload: CasePayload = self.get_json(&["cases", path_id(case_id)?]).await?;
        Ok(payload.into_inner())
    }

    pub async fn similar_cases(&self, case_id: &str) -> Result<Vec<SimilarCase>> {
        let resp: SimilarCasesResponse = self
            .get_json(&["cases", path_id(case_id)?, "similar"])
            .await?;
        Ok(resp.similar_cases)
    }

    /// Download a rendered case report.
    pub async fn export_case(&self, case_id: &str, format: ExportFormat) -> Result<Vec<u8>> {
        tracing::info!(case_id, format = format.as_str(), "Exporting case report");
        let resp = self
            .request(Method::GET, &["cases", path_id(case_id)?, "export"])?
            .query(&[("format", format.as_str())])
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    // --- Sessions & uploads ---

    /// List analysis sessions, optionally scoped to one organization.
    pub async fn sessions(&self, organization: Option<&str>) -> Result<Vec<SessionInfo>> {
        let mut req = self.request(Method::GET, &["sessions", ""])?;
        if let Some(org) = organization {
            req = req.query(&[("organization", org)]);
        }
        let resp = Self::ensure_success(req.send().await?).await?;
        let body = resp.text().await?;
        let sessions: SessionsResponse = serde_json::from_str(&body)?;
        Ok(sessions.sessions)
    }

    pub async fn upload_history(&self) -> Result<Vec<UploadRecord>> {
        let resp: UploadHistoryResponse = self.get_json(&["upload", "history"]).await?;
        Ok(resp.uploads)
    }

    pub async fn delete_upload(&self, upload_id: &str) -> Result<()> {
        tracing::info!(upload_id, "Deleting upload");
        let resp = self
            .request(Method::DELETE, &["upload", path_id(upload_id)?])?
            .send()
            .await?;
        Self::ensure_success(resp).await?;
        Ok(())
    }

    pub async fn merge_upload(&self, upload_id: &str) -> Result<MergeResponse> {
        tracing::info!(upload_id, "Merging upload into session");
        let resp = self
            .request(Method::POST, &["upload", path_id(upload_id)?, "merge"])?
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // --- Signals ---

    pub async fn statistical_signals(
        &self,
        threshold: f64,
        limit: u32,
    ) -> Result<Vec<StatisticalSignal>> {
        let resp = self
            .request(Method::GET, &["signals", "statistical"])?
            .query(&[("threshold", threshold.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let body = resp.text().await?;
        let parsed: StatisticalSignalsResponse = serde_json::from_str(&body)?;
        tracing::debug!(count = parsed.signals.len(), threshold, limit, "Fetched statistical signals");
        Ok(parsed.signals)
    }

    /// Fetch statistical signals and rank them as signal cards, in backend order.
    pub async fn ranked_signals(&self, threshold: f64, limit: u32) -> Result<Vec<SignalSummary>> {
        let raw = self.statistical_signals(threshold, limit).await?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.into_summary(i as u32 + 1))
            .collect())
    }
}

/// An id used as a single path segment. Dot segments and blanks would
/// address a different resource and are rejected.
fn path_id(id: &str) -> Result<&str> {
    match id.trim() {
        "" | "." | ".." => Err(ClientError::InvalidRequest(format!(
            "not a valid resource id: {id:?}"
        ))),
        _ => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_prefix_without_double_slash() {
        let client = VigilClient::new("https://pv.example.com/", None);
        assert_eq!(
            client.endpoint(&["cases", "42"]).unwrap().as_str(),
            "https://pv.example.com/api/v1/cases/42"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_ids() {
        let client = VigilClient::new("https://pv.example.com/pv", None);
        assert_eq!(
            client
                .endpoint(&["upload", "../cases/42?x#y", "merge"])
                .unwrap()
                .as_str(),
            "https://pv.example.com/pv/api/v1/upload/..%2Fcases%2F42%3Fx%23y/merge"
        );
        assert_eq!(
            client.endpoint(&["sessions", ""]).unwrap().as_str(),
            "https://pv.example.com/pv/api/v1/sessions/"
        );
    }

    #[tokio::test]
    async fn dot_ids_never_leave_the_client() {
        let client = VigilClient::new("http://127.0.0.1:9", None);
        for id in ["..", ".", "  "] {
            let err = client.delete_upload(id).await.unwrap_err();
            assert!(matches!(err, ClientError::InvalidRequest(_)), "got {err:?}");
        }
    }

    #[test]
    fn not_found_detection() {
        let err = ClientError::Api {
            status: 404,
            message: "missing".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!ClientError::Network("reset".to_string()).is_not_found());
    }
}
