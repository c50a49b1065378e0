use std::collections::HashSet;

use vigil_common::types::{Severity, SignalSummary};

/// The ordered list of signal cards currently on screen.
#[derive(Debug, Clone, Default)]
pub struct SignalList {
    signals: Vec<SignalSummary>,
}

impl SignalList {
    pub fn new(signals: Vec<SignalSummary>) -> Self {
        let mut list = Self::default();
        list.replace(signals);
        list
    }

    /// Swap in a fresh snapshot. Cards are ordered by rank; a repeated id
    /// keeps only its best-ranked entry.
    pub fn replace(&mut self, mut signals: Vec<SignalSummary>) {
        signals.sort_by_key(|s| s.rank);
        let mut seen = HashSet::new();
        signals.retain(|s| {
            let fresh = seen.insert(s.id.clone());
            if !fresh {
                tracing::warn!(signal_id = %s.id, rank = s.rank, "Dropping duplicate signal card");
            }
            fresh
        });
        self.signals = signals;
    }

    pub fn get(&self, id: &str) -> Option<&SignalSummary> {
        self.signals.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalSummary> {
        self.signals.iter()
    }

    pub fn as_slice(&self) -> &[SignalSummary] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &SignalSummary> {
        self.signals.iter().filter(move |s| s.severity == severity)
    }
}
