//! Plain-text renderings of coordinator state. Every function here is a pure
//! function of its inputs.

use vigil_common::display::{or_na, or_unknown};
use vigil_common::types::{CaseDetail, ChatMessage, ChatRole, MetricDetail, SignalSummary};

use crate::case_detail::CaseView;
use crate::drilldown::{AnalysisTab, DeepAnalysis};
use crate::upload::UploadItem;

/// One-line card: rank, pair, severity and the three metric chips.
pub fn signal_card(signal: &SignalSummary) -> String {
    format!(
        "#{} {} / {} [{}] PRR {:.1} | {} cases | {} | AI {:.0}%",
        signal.rank,
        signal.drug,
        signal.reaction,
        signal.severity,
        signal.prr,
        signal.cases,
        signal.trend,
        signal.ai_score * 100.0
    )
}

/// The inline drill-down bar, e.g. `PRR = 15.3 (Aspirin / GI bleeding)`.
pub fn detail_line(detail: Option<&MetricDetail>) -> Option<String> {
    detail.map(|d| {
        format!(
            "{} = {} ({} / {})",
            d.metric,
            d.signal.metric_value(d.metric),
            d.signal.drug,
            d.signal.reaction
        )
    })
}

pub fn deep_analysis(analysis: &DeepAnalysis) -> String {
    let s = &analysis.signal;
    let body = match analysis.tab {
        AnalysisTab::Overview => format!(
            "Severity: {}\nRank: {}\nAI score: {:.2}",
            s.severity, s.rank, s.ai_score
        ),
        AnalysisTab::Statistics => format!("PRR: {:.2}", s.prr),
        AnalysisTab::Cases => format!("Reported cases: {}", s.cases),
        AnalysisTab::Trend => format!("Trend: {}", s.trend),
    };
    format!("{} / {} :: {}\n{}", s.drug, s.reaction, analysis.tab, body)
}

pub fn chat_line(message: &ChatMessage) -> String {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
    };
    let mut out = format!("{speaker}: {}", message.text);
    if let Some(confirmation) = &message.confirmation {
        out.push_str(&format!(
            "\n  filters: {} (~{} cases)",
            confirmation.description,
            or_na(confirmation.estimated_count)
        ));
    }
    if !message.actions.is_empty() {
        let labels: Vec<&str> = message.actions.iter().map(|a| a.label.as_str()).collect();
        out.push_str(&format!("\n  actions: {}", labels.join(" | ")));
    }
    out
}

pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(chat_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn case_summary(case: &CaseDetail) -> String {
    format!(
        "Case {}: {} / {}\n  Outcome: {}\n  Age: {}\n  Sex: {}\n  Serious: {}\n  Reported: {}",
        case.id,
        case.drug,
        case.reaction,
        or_unknown(case.outcome.as_deref()),
        or_na(case.age),
        or_unknown(case.sex.as_deref()),
        if case.serious { "yes" } else { "no" },
        or_unknown(case.report_date.as_deref()),
    )
}

pub fn case_view(view: &CaseView) -> String {
    match view {
        CaseView::Idle => String::new(),
        CaseView::Loading { case_id } => format!("Loading case {case_id}..."),
        CaseView::Loaded { case, similar } => {
            let mut out = case_summary(case);
            if !similar.is_empty() {
                out.push_str("\n  Similar:");
                for s in similar {
                    out.push_str(&format!(
                        "\n    {} {} / {} ({:.0}%)",
                        s.id,
                        s.drug,
                        s.reaction,
                        s.similarity * 100.0
                    ));
                }
            }
            out
        }
        CaseView::Failed { message, .. } => message.clone(),
    }
}

pub fn upload_row(item: &UploadItem) -> String {
    let mut out = format!("{} [{}] {}%", item.name, item.status, item.progress);
    if let Some(session) = &item.session_id {
        out.push_str(&format!(" -> session {session}"));
    }
    if let Some(error) = &item.error {
        out.push_str(&format!(" ({error})"));
    }
    out
}
