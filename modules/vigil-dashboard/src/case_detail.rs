//! Case detail loading with cancellation.
//!
//! Each `load` supersedes the previous one: the old task is aborted and its
//! generation retired, so a late response can never land in the view.
//! Dropping the loader aborts whatever is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use vigil_common::types::{CaseDetail, SimilarCase};

use crate::traits::CaseSource;

pub const CASE_UNAVAILABLE: &str = "Couldn't load this case. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum CaseView {
    Idle,
    Loading {
        case_id: String,
    },
    Loaded {
        case: CaseDetail,
        similar: Vec<SimilarCase>,
    },
    Failed {
        case_id: String,
        message: String,
    },
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    view: CaseView,
}

pub struct CaseDetailLoader {
    source: Arc<dyn CaseSource>,
    slot: Arc<Mutex<Slot>>,
    inflight: Option<JoinHandle<()>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CaseDetailLoader {
    pub fn new(source: Arc<dyn CaseSource>) -> Self {
        Self {
            source,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                view: CaseView::Idle,
            })),
            inflight: None,
        }
    }

    pub fn view(&self) -> CaseView {
        lock(&self.slot).view.clone()
    }

    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.generation
    }

    /// Start fetching a case and its similar cases. Must run inside a tokio runtime.
    pub fn load(&mut self, case_id: &str) {
        let generation = self.supersede();
        lock(&self.slot).view = CaseView::Loading {
            case_id: case_id.to_string(),
        };

        let source = self.source.clone();
        let slot = self.slot.clone();
        let case_id = case_id.to_string();

        self.inflight = Some(tokio::spawn(async move {
            let (case, similar) =
                futures::join!(source.case(&case_id), source.similar_cases(&case_id));

            let view = match case {
                Ok(case) => {
                    let similar = similar.unwrap_or_else(|e| {
                        tracing::warn!(case_id = %case_id, error = %e, "Similar cases unavailable");
                        Vec::new()
                    });
                    CaseView::Loaded { case, similar }
                }
                Err(e) => {
                    tracing::warn!(case_id = %case_id, error = %e, "Case fetch failed");
                    CaseView::Failed {
                        case_id: case_id.clone(),
                        message: CASE_UNAVAILABLE.to_string(),
                    }
                }
            };

            let mut current = lock(&slot);
            if current.generation == generation {
                current.view = view;
            } else {
                tracing::debug!(case_id = %case_id, "Discarding stale case response");
            }
        }));
    }

    /// Abort any fetch and return to `Idle`.
    pub fn close(&mut self) {
        self.supersede();
        lock(&self.slot).view = CaseView::Idle;
    }

    /// Wait for the current fetch, if any, to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.inflight.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Case fetch task panicked");
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view(), CaseView::Loading { .. })
    }
}

impl Drop for CaseDetailLoader {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}
