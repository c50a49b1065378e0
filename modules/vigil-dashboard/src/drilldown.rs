//! Metric drill-down and deep-analysis selection.
//!
//! A metric chip opens the lightweight inline drill-down. A full-card click
//! opens the deep-analysis view. Both slots hold at most one selection and
//! the last write wins.

use serde::{Deserialize, Serialize};
use vigil_common::types::{MetricDetail, MetricKind, SignalSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTab {
    #[default]
    Overview,
    Statistics,
    Cases,
    Trend,
}

impl From<MetricKind> for AnalysisTab {
    fn from(metric: MetricKind) -> Self {
        match metric {
            MetricKind::Prr => AnalysisTab::Statistics,
            MetricKind::Cases => AnalysisTab::Cases,
            MetricKind::Trend => AnalysisTab::Trend,
        }
    }
}

impl std::fmt::Display for AnalysisTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisTab::Overview => write!(f, "Overview"),
            AnalysisTab::Statistics => write!(f, "Statistics"),
            AnalysisTab::Cases => write!(f, "Cases"),
            AnalysisTab::Trend => write!(f, "Trend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeepAnalysis {
    pub signal: SignalSummary,
    pub tab: AnalysisTab,
}

#[derive(Debug, Clone, Default)]
pub struct DrillDown {
    detail: Option<MetricDetail>,
    analysis: Option<DeepAnalysis>,
}

impl DrillDown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detail(&self) -> Option<&MetricDetail> {
        self.detail.as_ref()
    }

    pub fn analysis(&self) -> Option<&DeepAnalysis> {
        self.analysis.as_ref()
    }

    /// Replace the active drill-down. If the deep-analysis view is open on
    /// the same signal, jump it to the matching tab as well.
    pub fn select_metric(&mut self, metric: MetricKind, signal: SignalSummary) {
        if let Some(analysis) = self.analysis.as_mut() {
            if analysis.signal.id == signal.id {
                analysis.tab = metric.into();
            }
        }
        tracing::debug!(signal_id = %signal.id, %metric, "Metric selected");
        self.detail = Some(MetricDetail { metric, signal });
    }

    pub fn clear_detail(&mut self) {
        self.detail = None;
    }

    /// Open the deep-analysis view on its overview tab.
    pub fn select_card(&mut self, signal: SignalSummary) {
        tracing::debug!(signal_id = %signal.id, "Deep analysis opened");
        self.analysis = Some(DeepAnalysis {
            signal,
            tab: AnalysisTab::Overview,
        });
    }

    /// Switch tabs on the open deep-analysis view. No-op when closed.
    pub fn open_tab(&mut self, tab: AnalysisTab) {
        if let Some(analysis) = self.analysis.as_mut() {
            analysis.tab = tab;
        }
    }

    pub fn close_analysis(&mut self) {
        self.analysis = None;
    }

    /// Keep both selections pointing into `signals`. A selection whose signal
    /// is gone is cleared; a surviving one picks up the fresh snapshot.
    pub fn reconcile(&mut self, signals: &[SignalSummary]) {
        let fresh = |id: &str| signals.iter().find(|s| s.id == id).cloned();

        if let Some(detail) = self.detail.as_mut() {
            match fresh(&detail.signal.id) {
                Some(signal) => detail.signal = signal,
                None => {
                    tracing::debug!(signal_id = %detail.signal.id, "Drill-down signal left the list");
                    self.detail = None;
                }
            }
        }

        if let Some(analysis) = self.analysis.as_mut() {
            match fresh(&analysis.signal.id) {
                Some(signal) => analysis.signal = signal,
                None => {
                    tracing::debug!(signal_id = %analysis.signal.id, "Analysis signal left the list");
                    self.analysis = None;
                }
            }
        }
    }
}
