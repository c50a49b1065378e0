//! The signals page: composition root for the list, the drill-down and the
//! chat coupling flag.

use vigil_common::types::{Action, ActionKind, MetricKind, SignalSummary};
use vigil_common::DashboardContext;

use crate::drilldown::{AnalysisTab, DrillDown};
use crate::signals::SignalList;
use crate::traits::SignalSource;

pub const SIGNALS_UNAVAILABLE: &str = "Couldn't load signals. Showing the last known list.";

/// The chat action that last touched page state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastAction {
    Confirmed,
    AdjustFilters,
}

#[derive(Debug, Clone)]
pub struct SignalsPage {
    context: DashboardContext,
    signals: SignalList,
    drilldown: DrillDown,
    last_action: Option<LastAction>,
    load_error: Option<String>,
}

impl SignalsPage {
    pub fn new(context: DashboardContext) -> Self {
        Self {
            context,
            signals: SignalList::default(),
            drilldown: DrillDown::new(),
            last_action: None,
            load_error: None,
        }
    }

    pub fn context(&self) -> &DashboardContext {
        &self.context
    }

    pub fn signals(&self) -> &SignalList {
        &self.signals
    }

    pub fn drilldown(&self) -> &DrillDown {
        &self.drilldown
    }

    pub fn last_action(&self) -> Option<LastAction> {
        self.last_action
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Replace the list and re-anchor any open selection to it.
    pub fn refresh(&mut self, signals: Vec<SignalSummary>) {
        self.signals.replace(signals);
        self.drilldown.reconcile(self.signals.as_slice());
        self.load_error = None;
    }

    /// Fetch a new snapshot. On failure the current list stays on screen and
    /// a fallback notice is set.
    pub async fn reload(&mut self, source: &dyn SignalSource, threshold: f64, limit: u32) -> bool {
        match source.ranked_signals(threshold, limit).await {
            Ok(signals) => {
                tracing::info!(count = signals.len(), threshold, "Signals refreshed");
                self.refresh(signals);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Signal refresh failed");
                self.load_error = Some(SIGNALS_UNAVAILABLE.to_string());
                false
            }
        }
    }

    /// Metric chip click on a rendered card. Unknown ids are ignored.
    pub fn click_metric(&mut self, signal_id: &str, metric: MetricKind) -> bool {
        match self.signals.get(signal_id) {
            Some(signal) => {
                self.drilldown.select_metric(metric, signal.clone());
                true
            }
            None => {
                tracing::debug!(signal_id, "Metric click on a card no longer listed");
                false
            }
        }
    }

    /// Full-card click: opens the deep-analysis view.
    pub fn click_card(&mut self, signal_id: &str) -> bool {
        match self.signals.get(signal_id) {
            Some(signal) => {
                self.drilldown.select_card(signal.clone());
                true
            }
            None => false,
        }
    }

    pub fn dismiss_detail(&mut self) {
        self.drilldown.clear_detail();
    }

    pub fn close_analysis(&mut self) {
        self.drilldown.close_analysis();
    }

    pub fn open_tab(&mut self, tab: AnalysisTab) {
        self.drilldown.open_tab(tab);
    }

    /// Record a chat action that couples back into page state.
    pub fn apply_action(&mut self, action: &Action) -> Option<LastAction> {
        let applied = match action.kind {
            ActionKind::Confirm => LastAction::Confirmed,
            ActionKind::AdjustFilters => LastAction::AdjustFilters,
            _ => return None,
        };
        self.last_action = Some(applied);
        Some(applied)
    }

    pub fn take_last_action(&mut self) -> Option<LastAction> {
        self.last_action.take()
    }
}
