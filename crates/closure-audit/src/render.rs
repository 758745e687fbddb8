//! Markdown summary of a parity report.

use crate::classify::Classification;
use crate::report::AuditReport;

/// Gap ids listed in the action queue.
pub const ACTION_QUEUE_LIMIT: usize = 30;

pub fn render_markdown(report: &AuditReport) -> String {
    let mut lines: Vec<String> = vec![
        "# Bead Closure vs Risk Register Parity Audit".into(),
        String::new(),
        format!("Generated at: `{}`", report.generated_at),
        String::new(),
        "## Taxonomy".into(),
        String::new(),
        "- `covered_exact`: exact `## <bead-id>` risk heading exists.".into(),
        "- `covered_milestone_alias`: milestone heading (for example `M4`, `M5.1`) covers legacy bead naming.".into(),
        "- `covered_parent_rollup`: parent/feature bead can rely on fully-covered child evidence.".into(),
        "- `exempt_program_meta`: program/track orchestration bead exempt from per-bead risk entry.".into(),
        "- `gap_requires_entry`: no accepted evidence mapping; requires remediation.".into(),
        String::new(),
        "## Summary".into(),
        String::new(),
        format!("- Total closed beads audited: `{}`", report.summary.closed_total),
        format!("- Action-required gaps: `{}`", report.summary.action_required),
        String::new(),
        "Classification counts:".into(),
    ];
    for (code, count) in &report.summary.classification_counts {
        lines.push(format!("- `{}`: `{}`", code, count));
    }
    lines.extend([
        String::new(),
        "## Remediation Plan".into(),
        String::new(),
        "1. Keep the closure gate in CI for non-exempt closed beads.".into(),
        "2. Backfill historical `gap_requires_entry` beads or record an explicit exemption rationale.".into(),
        "3. Keep parent/feature rollups auditable by preserving child evidence links.".into(),
        String::new(),
        "## Initial Action Queue (gap IDs)".into(),
        String::new(),
    ]);

    let queue: Vec<&str> = report
        .rows
        .iter()
        .filter(|r| r.classification == Classification::GapRequiresEntry)
        .map(|r| r.id.as_str())
        .take(ACTION_QUEUE_LIMIT)
        .collect();
    if queue.is_empty() {
        lines.push("- None".into());
    } else {
        lines.extend(queue.iter().map(|id| format!("- `{}`", id)));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportRow;
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    fn report(gaps: usize) -> AuditReport {
        let rows = (0..gaps)
            .map(|i| ReportRow {
                id: format!("bd-{:03}", i),
                title: String::new(),
                issue_type: "task".into(),
                classification: Classification::GapRequiresEntry,
                covered: false,
                evidence_refs: Vec::new(),
                dependencies_parent_children: Vec::new(),
                close_reason: String::new(),
            })
            .collect();
        AuditReport::new(
            &Utc.with_ymd_and_hms(2026, 2, 18, 0, 0, 0).unwrap(),
            Path::new("issues.jsonl"),
            Path::new("RISK.md"),
            rows,
        )
    }

    #[test]
    fn empty_queue_says_none() {
        let md = render_markdown(&report(0));
        assert!(md.contains("Generated at: `2026-02-18T00:00:00Z`"));
        assert!(md.contains("- Total closed beads audited: `0`"));
        assert!(md.ends_with("- None\n"));
    }

    #[test]
    fn queue_is_capped() {
        let md = render_markdown(&report(40));
        assert!(md.contains("- `gap_requires_entry`: `40`"));
        assert!(md.contains("- `bd-029`"));
        assert!(!md.contains("- `bd-030`"));
    }
}
