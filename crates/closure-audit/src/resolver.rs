//! Two-pass coverage resolution.
//!
//! Pass 1 classifies every closed record with rollup disabled and freezes the
//! resulting coverage booleans. Pass 2 classifies again with rollup enabled,
//! reading only the frozen pass-1 lookup. A parent therefore inherits coverage
//! only from children that are covered directly; rollup is one level deep.

use crate::classify::{classify, CoverageLookup};
use crate::evidence::EvidenceIndex;
use crate::records::RecordStore;
use crate::report::ReportRow;

/// Pass 1: direct coverage (exact, milestone alias, meta) of every closed
/// record.
pub fn direct_coverage(store: &RecordStore, evidence: &EvidenceIndex) -> CoverageLookup {
    store
        .closed()
        .into_iter()
        .map(|record| {
            let outcome = classify(record, evidence, store.children(), None);
            (record.id.clone(), outcome.is_covered())
        })
        .collect()
}

/// Pass 2: final classification of every closed record, sorted by id.
pub fn final_rows(
    store: &RecordStore,
    evidence: &EvidenceIndex,
    coverage: &CoverageLookup,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = store
        .closed()
        .into_iter()
        .map(|record| {
            let outcome = classify(record, evidence, store.children(), Some(coverage));
            ReportRow {
                id: record.id.clone(),
                title: record.title.clone(),
                issue_type: record.kind.to_string(),
                classification: outcome.classification,
                covered: outcome.is_covered(),
                evidence_refs: outcome.evidence_refs,
                dependencies_parent_children: store.children().children_of(&record.id).to_vec(),
                close_reason: record.close_reason.clone(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

/// Runs both passes, in order, once each.
pub struct CoverageResolver<'a> {
    store: &'a RecordStore,
    evidence: &'a EvidenceIndex,
}

impl<'a> CoverageResolver<'a> {
    pub fn new(store: &'a RecordStore, evidence: &'a EvidenceIndex) -> Self {
        Self { store, evidence }
    }

    pub fn resolve(&self) -> Vec<ReportRow> {
        let coverage = direct_coverage(self.store, self.evidence);
        tracing::debug!(
            closed = coverage.len(),
            directly_covered = coverage.covered_count(),
            "pass 1 complete"
        );
        let rows = final_rows(self.store, self.evidence, &coverage);
        tracing::debug!(
            rows = rows.len(),
            covered = rows.iter().filter(|r| r.covered).count(),
            "pass 2 complete"
        );
        rows
    }
}
