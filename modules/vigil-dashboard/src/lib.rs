pub mod case_detail;
pub mod chat;
pub mod drilldown;
pub mod page;
pub mod presenter;
pub mod signals;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod upload;

pub use case_detail::{CaseDetailLoader, CaseView};
pub use chat::{ChatPanel, ChatPhase, IgnoreReason, SubmitOutcome};
pub use drilldown::{AnalysisTab, DeepAnalysis, DrillDown};
pub use page::{LastAction, SignalsPage};
pub use signals::SignalList;
pub use upload::{ArchiveEntry, UploadError, UploadItem, UploadTracker};
