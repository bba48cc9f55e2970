use casewatch_core::{
    Case, CaseId, CaseStatus, MembershipPlan, PollStop, RiskLevel, StopReason, ViewState,
    POLL_BUDGET,
};

pub fn case_header() -> String {
    format!("{:<14} {:<10} {:>14}  {}", "CASE", "STATUS", "RISK", "CREATED")
}

pub fn case_row(case: &Case) -> String {
    let risk = match case.risk_score {
        Some(score) => {
            let score = score.min(100);
            format!("{score} ({})", RiskLevel::from_score(score).label())
        }
        None => "-".to_string(),
    };
    format!(
        "{:<14} {:<10} {:>14}  {}",
        case.id.as_str(),
        case.status.label(),
        risk,
        case.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// Counts shown under the dashboard table.
pub fn summary_line(cases: &[Case]) -> String {
    let count = |status: CaseStatus| cases.iter().filter(|case| case.status == status).count();
    let high_or_critical = cases
        .iter()
        .filter(|case| case.status == CaseStatus::Analyzed)
        .filter_map(|case| case.risk_score)
        .filter(|score| {
            matches!(
                RiskLevel::from_score(*score),
                RiskLevel::High | RiskLevel::Critical
            )
        })
        .count();
    format!(
        "total {} | pending {} | processing {} | analyzed {} | failed {} | high/critical {}",
        cases.len(),
        count(CaseStatus::Uploaded),
        count(CaseStatus::Processing),
        count(CaseStatus::Analyzed),
        count(CaseStatus::Failed),
        high_or_critical
    )
}

pub fn view_line(case_id: &CaseId, view: &ViewState) -> String {
    let mut line = format!(
        "{:<14} {:<10} {}",
        case_id.as_str(),
        view.display_status.label(),
        view.message
    );
    if let Some(hint) = view.refresh_hint() {
        line.push_str(&format!("  [{hint}]"));
    }
    line
}

pub fn stop_line(stop: &PollStop) -> String {
    let case_id = stop.case_id.as_str();
    match stop.reason {
        StopReason::Completed => format!("{case_id}: settled"),
        StopReason::Cancelled => format!("{case_id}: stopped"),
        StopReason::TimedOut => {
            let last = stop
                .last_view
                .as_ref()
                .map(|view| view.display_status.label())
                .unwrap_or("unknown");
            format!(
                "{case_id}: auto-refresh paused after {}s, last status {last}",
                POLL_BUDGET.as_secs()
            )
        }
        StopReason::Error => format!(
            "{case_id}: auto-refresh stopped ({})",
            stop.error.as_deref().unwrap_or("fetch failed")
        ),
    }
}

/// One line per membership change, empty when nothing changed.
pub fn plan_lines(plan: &MembershipPlan) -> Vec<String> {
    let started = plan
        .start
        .iter()
        .map(|(case_id, _)| format!("{}: watching", case_id.as_str()));
    let released = plan
        .release
        .iter()
        .map(|case_id| format!("{}: no longer pending", case_id.as_str()));
    started.chain(released).collect()
}

/// Exit status for a single-case watch: non-zero when polling gave up on its own.
pub fn exit_code_for(reason: StopReason) -> u8 {
    if reason.is_self_inflicted() {
        2
    } else {
        0
    }
}
