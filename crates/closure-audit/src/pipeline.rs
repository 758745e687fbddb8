//! End-to-end audit and gate runs driven by an [`AuditConfig`].

use crate::config::AuditConfig;
use crate::error::Result;
use crate::evidence::EvidenceIndex;
use crate::exemptions::ExemptionLedger;
use crate::gate::{GateVerdict, Reconciliation};
use crate::records::RecordStore;
use crate::render::render_markdown;
use crate::report::{load_rows, write_atomic, AuditReport};
use crate::resolver::CoverageResolver;

/// Load both input documents and classify every closed record.
///
/// All inputs are read fully before any classification starts. Nothing is
/// written to disk.
pub fn build_report(config: &AuditConfig) -> Result<AuditReport> {
    let store = RecordStore::load(&config.inputs.issues_jsonl)?;
    let evidence = EvidenceIndex::load(&config.inputs.risk_register)?;
    let generated_at = config.report.generated_at()?;

    let rows = CoverageResolver::new(&store, &evidence).resolve();
    Ok(AuditReport::new(
        &generated_at,
        &config.inputs.issues_jsonl,
        &config.inputs.risk_register,
        rows,
    ))
}

/// Build the report and write its artifacts.
pub fn run_audit(config: &AuditConfig) -> Result<AuditReport> {
    let report = build_report(config)?;

    write_atomic(&config.outputs.report_json, &report.to_canonical_json()?)?;
    if let Some(md) = &config.outputs.report_markdown {
        write_atomic(md, &render_markdown(&report))?;
    }

    tracing::info!(
        closed = report.summary.closed_total,
        action_required = report.summary.action_required,
        json = %config.outputs.report_json.display(),
        "parity audit written"
    );
    Ok(report)
}

/// Result of a gate run.
#[derive(Clone, Debug)]
pub struct GateOutcome {
    pub report: AuditReport,
    pub reconciliation: Reconciliation,
}

impl GateOutcome {
    pub fn verdict(&self) -> GateVerdict {
        self.reconciliation.verdict()
    }
}

/// Run the audit as a subordinate step, then reconcile the rows read back
/// from the written report against the exemption ledger.
///
/// The ledger is validated first: an invalid ledger aborts the run before
/// any classification and leaves no report behind.
pub fn run_gate(config: &AuditConfig) -> Result<GateOutcome> {
    let ledger = ExemptionLedger::load(&config.inputs.exemptions)?;
    let report = run_audit(config)?;
    let rows = load_rows(&config.outputs.report_json)?;

    let reconciliation = Reconciliation::compute(&rows, &ledger);
    if reconciliation.has_stale() {
        tracing::warn!(stale = ?reconciliation.stale, "stale exemptions");
    }
    tracing::info!(
        gaps = reconciliation.gap_ids.len(),
        exempted = reconciliation.exempted_gaps.len(),
        unresolved = reconciliation.unresolved.len(),
        verdict = %reconciliation.verdict(),
        "closure gate evaluated"
    );
    Ok(GateOutcome {
        report,
        reconciliation,
    })
}
