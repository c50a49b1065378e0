use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VigilError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "Increasing"),
            Trend::Decreasing => write!(f, "Decreasing"),
            Trend::Stable => write!(f, "Stable"),
        }
    }
}

/// The metric chips shown on every signal card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Prr,
    Cases,
    Trend,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Prr => write!(f, "PRR"),
            MetricKind::Cases => write!(f, "Cases"),
            MetricKind::Trend => write!(f, "Trend"),
        }
    }
}

// --- Signals ---

/// A ranked drug–reaction pair as produced by the signal-detection backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignalSummary {
    pub id: String,
    pub rank: u32,
    pub drug: String,
    pub reaction: String,
    pub prr: f64,
    pub cases: u64,
    /// Model confidence in 0.0..=1.0.
    pub ai_score: f64,
    pub trend: Trend,
    pub severity: Severity,
}

impl SignalSummary {
    /// Stable key for a drug–reaction pair, used when the backend omits an id.
    pub fn pair_key(drug: &str, reaction: &str) -> String {
        format!(
            "{}::{}",
            drug.trim().to_lowercase(),
            reaction.trim().to_lowercase()
        )
    }

    /// Current value of one metric chip, as shown on the card.
    pub fn metric_value(&self, metric: MetricKind) -> String {
        match metric {
            MetricKind::Prr => format!("{:.1}", self.prr),
            MetricKind::Cases => self.cases.to_string(),
            MetricKind::Trend => self.trend.to_string(),
        }
    }
}

/// The single active drill-down selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDetail {
    pub metric: MetricKind,
    pub signal: SignalSummary,
}

// --- Chat ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Confirm,
    AdjustFilters,
    ViewCases,
    Export,
    #[serde(other)]
    Unknown,
}

/// A follow-up button attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default = "default_action_kind")]
    pub kind: ActionKind,
}

fn default_action_kind() -> ActionKind {
    ActionKind::Unknown
}

/// The backend's interpretation of a query, awaiting user confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfirmation {
    pub description: String,
    #[serde(default)]
    pub estimated_count: Option<u64>,
    #[serde(default)]
    pub filters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<QueryConfirmation>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.into(),
            actions: Vec::new(),
            confirmation: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            text: text.into(),
            actions: Vec::new(),
            confirmation: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_confirmation(mut self, confirmation: Option<QueryConfirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }
}

// --- Uploads ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Queued,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Queued => write!(f, "queued"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One entry of the server's upload history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    pub filename: String,
    pub status: UploadStatus,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub case_count: u64,
    #[serde(default)]
    pub session_id: Option<String>,
}

// --- Cases & sessions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetail {
    pub id: String,
    pub drug: String,
    pub reaction: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub serious: bool,
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub id: String,
    pub similarity: f64,
    pub drug: String,
    pub reaction: String,
}

/// An immutable snapshot of ingested case data tied to one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub case_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Word,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "word",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "docx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "word" | "docx" => Ok(ExportFormat::Word),
            other => Err(VigilError::Validation(format!(
                "unsupported export format: {other}"
            ))),
        }
    }
}
