#![deny(unsafe_code)]
//! # closure-audit
//!
//! Audits whether closed beads have evidence in the risk register and gates
//! CI on unresolved, non-exempt gaps.
//!
//! ## Flow
//!
//! [`RecordStore`] + [`EvidenceIndex`] -> [`CoverageResolver`] (two passes of
//! [`classify()`]) -> [`AuditReport`] -> [`Reconciliation`] against the
//! [`ExemptionLedger`] -> [`GateVerdict`].
//!
//! ## Key Types
//!
//! - [`Classification`]: the five mutually exclusive coverage tags
//! - [`CoverageLookup`]: frozen pass-1 direct coverage used for rollup
//! - [`AuditConfig`]: explicit paths and report settings, no global state
//! - [`defer`]: independent validation of the deferred-coverage waiver ledger

pub mod classify;
pub mod config;
pub mod defer;
pub mod error;
pub mod evidence;
pub mod exemptions;
pub mod gate;
pub mod patterns;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod report;
pub mod resolver;

pub use classify::{classify, Classification, CoverageLookup, Outcome, Severity};
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use evidence::EvidenceIndex;
pub use exemptions::ExemptionLedger;
pub use gate::{diagnostics, ArtifactRefs, GateVerdict, Reconciliation};
pub use pipeline::{build_report, run_audit, run_gate, GateOutcome};
pub use records::{ChildIndex, Dependency, Record, RecordKind, RecordStore};
pub use render::render_markdown;
pub use report::{AuditReport, ReportRow};
pub use resolver::CoverageResolver;
