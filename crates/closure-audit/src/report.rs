//! Classification report model, serialization and on-disk artifacts.

use crate::classify::{Classification, Severity};
use crate::error::{AuditError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout of `generated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One classified closed record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub title: String,
    pub issue_type: String,
    pub classification: Classification,
    pub covered: bool,
    pub evidence_refs: Vec<String>,
    pub dependencies_parent_children: Vec<String>,
    pub close_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInputs {
    pub issues_jsonl: String,
    pub risk_register: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub code: String,
    pub severity: Severity,
    pub rationale: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub closed_total: usize,
    /// Only tags that occur, keyed by tag code.
    pub classification_counts: BTreeMap<String, usize>,
    pub action_required: usize,
}

/// The full parity report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: String,
    pub inputs: ReportInputs,
    pub taxonomy: BTreeMap<String, TaxonomyEntry>,
    pub summary: ReportSummary,
    pub rows: Vec<ReportRow>,
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Fixed taxonomy of all five classifications.
pub fn taxonomy() -> BTreeMap<String, TaxonomyEntry> {
    Classification::ALL
        .iter()
        .map(|c| {
            (
                c.code().to_string(),
                TaxonomyEntry {
                    code: c.code().to_string(),
                    severity: c.severity(),
                    rationale: c.rationale().to_string(),
                },
            )
        })
        .collect()
}

impl AuditReport {
    /// Assemble a report from final rows. Rows are re-sorted by id so the
    /// report is ordered regardless of how the caller built them.
    pub fn new(
        generated_at: &DateTime<Utc>,
        issues_jsonl: &Path,
        risk_register: &Path,
        mut rows: Vec<ReportRow>,
    ) -> Self {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in &rows {
            *counts.entry(row.classification.code().to_string()).or_default() += 1;
        }
        let action_required = counts
            .get(Classification::GapRequiresEntry.code())
            .copied()
            .unwrap_or(0);
        Self {
            generated_at: format_timestamp(generated_at),
            inputs: ReportInputs {
                issues_jsonl: issues_jsonl.display().to_string(),
                risk_register: risk_register.display().to_string(),
            },
            taxonomy: taxonomy(),
            summary: ReportSummary {
                closed_total: rows.len(),
                classification_counts: counts,
                action_required,
            },
            rows,
        }
    }

    /// Ids tagged `gap_requires_entry`, in row order.
    pub fn gap_ids(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|r| r.classification == Classification::GapRequiresEntry)
            .map(|r| r.id.as_str())
    }

    /// Pretty JSON with keys sorted at every level and a trailing newline.
    pub fn to_canonical_json(&self) -> Result<String> {
        // serde_json::Value objects are BTreeMap-backed, which sorts keys.
        let value = serde_json::to_value(self)?;
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        Ok(out)
    }
}

/// Mode of written artifacts; the temp file would otherwise keep 0600.
#[cfg(unix)]
pub const ARTIFACT_MODE: u32 = 0o644;

/// Write `contents` to `path` through a temp file in the same directory, so
/// a failed run never leaves a partial artifact at `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| AuditError::io(&dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| AuditError::io(&dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| AuditError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))
            .map_err(|e| AuditError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| AuditError::io(path, e.error))?;
    Ok(())
}

/// Read back the `rows` array of a serialized report.
///
/// This is the only part of the report the closure gate consumes.
pub fn load_rows(path: &Path) -> Result<Vec<ReportRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| AuditError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    let object = value
        .as_object()
        .ok_or_else(|| AuditError::NotAnObject(path.to_path_buf()))?;
    let rows = match object.get("rows") {
        Some(rows @ serde_json::Value::Array(_)) => rows.clone(),
        _ => return Err(AuditError::ReportMissingRows(path.to_path_buf())),
    };
    serde_json::from_value(rows).map_err(|source| AuditError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, classification: Classification) -> ReportRow {
        ReportRow {
            id: id.into(),
            title: format!("title {}", id),
            issue_type: "task".into(),
            classification,
            covered: classification.is_covered(),
            evidence_refs: Vec::new(),
            dependencies_parent_children: Vec::new(),
            close_reason: String::new(),
        }
    }

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 0, 0, 0).unwrap()
    }

    fn sample() -> AuditReport {
        AuditReport::new(
            &fixed(),
            Path::new(".beads/issues.jsonl"),
            Path::new("docs/RISK_REGISTER.md"),
            vec![
                row("b", Classification::GapRequiresEntry),
                row("a", Classification::CoveredExact),
                row("c", Classification::GapRequiresEntry),
            ],
        )
    }

    #[test]
    fn summary_counts() {
        let r = sample();
        assert_eq!(r.generated_at, "2026-02-18T00:00:00Z");
        assert_eq!(r.summary.closed_total, 3);
        assert_eq!(r.summary.action_required, 2);
        assert_eq!(r.summary.classification_counts.get("covered_exact"), Some(&1));
        assert!(!r.summary.classification_counts.contains_key("exempt_program_meta"));
        assert_eq!(r.taxonomy.len(), 5);
        assert_eq!(r.gap_ids().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn rows_resorted() {
        let ids: Vec<_> = sample().rows.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let json = sample().to_canonical_json().unwrap();
        assert!(json.ends_with("}\n"));
        let classification = json.find("\"classification\"").unwrap();
        let close_reason = json.find("\"close_reason\"").unwrap();
        let covered = json.find("\"covered\"").unwrap();
        assert!(classification < close_reason && close_reason < covered);
        assert!(json.find("\"generated_at\"").unwrap() < json.find("\"inputs\"").unwrap());
    }

    #[test]
    fn canonical_json_is_stable() {
        assert_eq!(
            sample().to_canonical_json().unwrap(),
            sample().to_canonical_json().unwrap()
        );
    }

    #[test]
    fn write_then_load_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.json");
        let report = sample();
        write_atomic(&path, &report.to_canonical_json().unwrap()).unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows, report.rows);
    }

    #[test]
    fn load_rows_requires_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{"rows": {}}"#).unwrap();
        assert!(matches!(
            load_rows(&path).unwrap_err(),
            AuditError::ReportMissingRows(_)
        ));
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(load_rows(&path).unwrap_err(), AuditError::NotAnObject(_)));
        std::fs::write(&path, "{oops").unwrap();
        assert!(matches!(
            load_rows(&path).unwrap_err(),
            AuditError::InvalidJson { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn written_artifacts_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        write_atomic(&path, "{}\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ARTIFACT_MODE);
    }
}
