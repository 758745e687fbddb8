//! Closure gate: reconcile report gaps against the exemption ledger.

use crate::classify::Classification;
use crate::exemptions::ExemptionLedger;
use crate::report::ReportRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Contract id printed on gate failure.
pub const CONTRACT_ID: &str = "CLOSE-001";

/// Outcome of the gate. A failure is a normal result, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateVerdict {
    Pass,
    Fail,
}

impl GateVerdict {
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Process exit status: 0 on pass, 1 on fail.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Set algebra between report gaps and exemptions. All lists are sorted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub gap_ids: Vec<String>,
    pub exempt_ids: Vec<String>,
    /// `gap_ids - exempt_ids`: gaps nobody has acknowledged.
    pub unresolved: Vec<String>,
    /// `exempt_ids - gap_ids`: exemptions that outlived their gap.
    pub stale: Vec<String>,
    /// `gap_ids & exempt_ids`.
    pub exempted_gaps: Vec<String>,
}

impl Reconciliation {
    /// Reconcile final report rows against the ledger. Rows with an empty id
    /// are ignored.
    pub fn compute(rows: &[ReportRow], ledger: &ExemptionLedger) -> Self {
        let gaps: BTreeSet<&str> = rows
            .iter()
            .filter(|r| r.classification == Classification::GapRequiresEntry)
            .map(|r| r.id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        let exempt: BTreeSet<&str> = ledger.ids().collect();

        let owned = |set: BTreeSet<&str>| -> Vec<String> {
            set.into_iter().map(str::to_string).collect()
        };
        Self {
            unresolved: owned(gaps.difference(&exempt).copied().collect()),
            stale: owned(exempt.difference(&gaps).copied().collect()),
            exempted_gaps: owned(gaps.intersection(&exempt).copied().collect()),
            gap_ids: owned(gaps),
            exempt_ids: owned(exempt),
        }
    }

    /// Fails iff an unresolved gap exists; stale exemptions never fail.
    pub fn verdict(&self) -> GateVerdict {
        if self.unresolved.is_empty() {
            GateVerdict::Pass
        } else {
            GateVerdict::Fail
        }
    }

    pub fn has_stale(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Paths of the audit artifacts the diagnostics point at.
#[derive(Clone, Debug, Default)]
pub struct ArtifactRefs {
    pub report_json: String,
    pub report_markdown: Option<String>,
    /// Command that reproduces this gate run.
    pub replay: String,
}

/// Line-oriented diagnostics for CI logs.
pub fn diagnostics(rec: &Reconciliation, artifacts: &ArtifactRefs) -> Vec<String> {
    let mut lines = Vec::new();
    if rec.has_stale() {
        lines.push("CLOSURE_EVIDENCE_WARN stale exemptions (remove after backfill):".to_string());
        lines.extend(rec.stale.iter().map(|id| format!("  - {}", id)));
    }

    match rec.verdict() {
        GateVerdict::Fail => {
            lines.push(format!(
                "CONTRACT_FAIL[{}] unresolved closure-evidence gaps:",
                CONTRACT_ID
            ));
            lines.extend(rec.unresolved.iter().map(|id| format!("  - {}", id)));
            lines.push(format!("audit_json={}", artifacts.report_json));
            if let Some(md) = &artifacts.report_markdown {
                lines.push(format!("audit_markdown={}", md));
            }
            lines.push(format!("replay: {}", artifacts.replay));
            lines.push(
                "fix: add risk-register entry or explicit exemption rationale per policy"
                    .to_string(),
            );
        }
        GateVerdict::Pass => {
            lines.push(format!(
                "CLOSURE_EVIDENCE_OK gaps={} covered_by_exemptions={} unresolved=0",
                rec.gap_ids.len(),
                rec.exempted_gaps.len()
            ));
            if let Some(md) = &artifacts.report_markdown {
                lines.push(format!("CLOSURE_EVIDENCE_OK markdown={}", md));
            }
            lines.push(format!("CLOSURE_EVIDENCE_OK json={}", artifacts.report_json));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, classification: Classification) -> ReportRow {
        ReportRow {
            id: id.into(),
            title: String::new(),
            issue_type: String::new(),
            classification,
            covered: classification.is_covered(),
            evidence_refs: Vec::new(),
            dependencies_parent_children: Vec::new(),
            close_reason: String::new(),
        }
    }

    fn artifacts() -> ArtifactRefs {
        ArtifactRefs {
            report_json: "out/audit.json".into(),
            report_markdown: Some("out/audit.md".into()),
            replay: "closure-audit gate".into(),
        }
    }

    #[test]
    fn set_algebra() {
        let rows = vec![
            row("g1", Classification::GapRequiresEntry),
            row("g2", Classification::GapRequiresEntry),
            row("ok", Classification::CoveredExact),
            row("", Classification::GapRequiresEntry),
        ];
        let ledger: ExemptionLedger = [("g2", "accepted"), ("old", "backfilled"), ("ok", "x")]
            .into_iter()
            .collect();
        let rec = Reconciliation::compute(&rows, &ledger);
        assert_eq!(rec.gap_ids, vec!["g1", "g2"]);
        assert_eq!(rec.unresolved, vec!["g1"]);
        assert_eq!(rec.stale, vec!["ok", "old"]);
        assert_eq!(rec.exempted_gaps, vec!["g2"]);
        assert_eq!(rec.verdict(), GateVerdict::Fail);
    }

    #[test]
    fn stale_alone_passes() {
        let rows = vec![row("a", Classification::CoveredMilestoneAlias)];
        let ledger: ExemptionLedger = [("gone", "fixed later")].into_iter().collect();
        let rec = Reconciliation::compute(&rows, &ledger);
        assert_eq!(rec.verdict(), GateVerdict::Pass);
        assert!(rec.has_stale());

        let lines = diagnostics(&rec, &artifacts());
        assert_eq!(lines[0], "CLOSURE_EVIDENCE_WARN stale exemptions (remove after backfill):");
        assert_eq!(lines[1], "  - gone");
        assert_eq!(lines[2], "CLOSURE_EVIDENCE_OK gaps=0 covered_by_exemptions=0 unresolved=0");
    }

    #[test]
    fn failure_diagnostics_enumerate_gaps() {
        let rows = vec![
            row("b", Classification::GapRequiresEntry),
            row("a", Classification::GapRequiresEntry),
        ];
        let rec = Reconciliation::compute(&rows, &ExemptionLedger::default());
        let lines = diagnostics(&rec, &artifacts());
        assert_eq!(lines[0], "CONTRACT_FAIL[CLOSE-001] unresolved closure-evidence gaps:");
        assert_eq!(&lines[1..3], &["  - a".to_string(), "  - b".to_string()]);
        assert!(lines.contains(&"audit_json=out/audit.json".to_string()));
        assert!(lines.contains(&"audit_markdown=out/audit.md".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("replay: ")));
        assert!(lines.last().unwrap().starts_with("fix: "));
    }

    #[test]
    fn verdict_exit_codes() {
        assert_eq!(GateVerdict::Pass.exit_code(), 0);
        assert_eq!(GateVerdict::Fail.exit_code(), 1);
        assert!(GateVerdict::Pass.is_pass());
        assert_eq!(format!("{}", GateVerdict::Fail), "fail");
    }
}
