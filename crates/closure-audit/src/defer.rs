//! Deferred coverage waiver ledger validation.
//!
//! Independent of the classification engine: it reads its own document and
//! reports every violation it finds rather than stopping at the first.

use crate::error::{AuditError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Array field of the waiver ledger document.
pub const ENTRIES_FIELD: &str = "entries";

/// Accepted `risk_rank` values.
pub const RISK_LEVELS: [&str; 4] = ["P0", "P1", "P2", "P3"];

/// Fields every entry must carry.
pub const REQUIRED_ENTRY_FIELDS: [&str; 11] = [
    "id",
    "surface",
    "risk_rank",
    "owner",
    "rationale",
    "compensating_controls",
    "created_on",
    "revisit_on",
    "expires_on",
    "status",
    "linked_beads",
];

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// Result of validating a waiver ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferReport {
    pub entries: usize,
    pub errors: Vec<String>,
}

impl DeferReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a parsed waiver ledger against `today`.
///
/// Structural problems with the document itself (not an object, no
/// `entries` array) are errors; problems with individual entries are
/// collected into the returned report.
pub fn validate(value: &Value, source: &Path, today: NaiveDate) -> Result<DeferReport> {
    let object = value
        .as_object()
        .ok_or_else(|| AuditError::NotAnObject(source.to_path_buf()))?;
    let entries = object
        .get(ENTRIES_FIELD)
        .and_then(Value::as_array)
        .ok_or_else(|| AuditError::MissingDeferEntries {
            path: source.to_path_buf(),
            field: ENTRIES_FIELD,
        })?;

    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            errors.push(format!("entry[{}] must be an object", index));
            continue;
        };
        validate_entry(entry, index, today, &mut seen, &mut errors);
    }

    Ok(DeferReport {
        entries: entries.len(),
        errors,
    })
}

fn validate_entry(
    entry: &Map<String, Value>,
    index: usize,
    today: NaiveDate,
    seen: &mut BTreeSet<String>,
    errors: &mut Vec<String>,
) {
    let label = match entry.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => format!("entry[{}]", index),
    };

    let missing: Vec<&str> = REQUIRED_ENTRY_FIELDS
        .iter()
        .copied()
        .filter(|f| !entry.contains_key(*f))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        errors.push(format!("{}: missing required fields: {}", label, missing.join(", ")));
        return;
    }

    match entry.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => {
            if !seen.insert(id.to_string()) {
                errors.push(format!("{}: duplicate id", id));
            }
        }
        _ => errors.push(format!("entry[{}]: id must be a non-empty string", index)),
    }

    let rank_ok = entry
        .get("risk_rank")
        .and_then(Value::as_str)
        .is_some_and(|r| RISK_LEVELS.contains(&r));
    if !rank_ok {
        errors.push(format!(
            "{}: risk_rank must be one of [{}]",
            label,
            RISK_LEVELS.join(", ")
        ));
    }

    for field in ["surface", "owner", "rationale", "status"] {
        if !is_non_empty_str(entry.get(field)) {
            errors.push(format!("{}: {} must be a non-empty string", label, field));
        }
    }

    for field in ["compensating_controls", "linked_beads"] {
        match entry.get(field).and_then(Value::as_array) {
            Some(items) if !items.is_empty() => {
                if !items.iter().all(|i| is_non_empty_str(Some(i))) {
                    errors.push(format!("{}: {} must contain non-empty strings", label, field));
                }
            }
            _ => errors.push(format!("{}: {} must be a non-empty array", label, field)),
        }
    }

    let created_on = parse_date(entry.get("created_on"), "created_on", &label, errors);
    let revisit_on = parse_date(entry.get("revisit_on"), "revisit_on", &label, errors);
    let expires_on = parse_date(entry.get("expires_on"), "expires_on", &label, errors);

    if let (Some(created), Some(revisit)) = (created_on, revisit_on) {
        if revisit < created {
            errors.push(format!("{}: revisit_on must be on/after created_on", label));
        }
    }
    if let Some(expires) = expires_on {
        if expires < today {
            errors.push(format!(
                "{}: expires_on={} is expired (today={})",
                label,
                expires.format("%Y-%m-%d"),
                today.format("%Y-%m-%d")
            ));
        }
    }
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn parse_date(
    value: Option<&Value>,
    field: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<NaiveDate> {
    let Some(raw) = value.and_then(Value::as_str).filter(|s| DATE_RE.is_match(s)) else {
        errors.push(format!("{}: {} must be YYYY-MM-DD", label, field));
        return None;
    };
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{}: {} is not a valid date", label, field));
            None
        }
    }
}

/// Load and validate the waiver ledger at `path`.
pub fn validate_file(path: &Path, today: NaiveDate) -> Result<DeferReport> {
    let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|source| AuditError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    let report = validate(&value, path, today)?;
    tracing::debug!(
        path = %path.display(),
        entries = report.entries,
        errors = report.errors.len(),
        "validated defer register"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn entry(id: &str) -> Value {
        json!({
            "id": id,
            "surface": "tui",
            "risk_rank": "P2",
            "owner": "core",
            "rationale": "flaky terminal emulation",
            "compensating_controls": ["manual smoke"],
            "created_on": "2026-01-10",
            "revisit_on": "2026-02-10",
            "expires_on": "2026-06-30",
            "status": "active",
            "linked_beads": ["bd-12"]
        })
    }

    fn check(entries: Vec<Value>) -> DeferReport {
        validate(&json!({ "entries": entries }), Path::new("defer.json"), today()).unwrap()
    }

    #[test]
    fn valid_entries_pass() {
        let report = check(vec![entry("DEF-1"), entry("DEF-2")]);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.entries, 2);
    }

    #[test]
    fn missing_fields_listed_sorted() {
        let mut e = entry("DEF-1");
        let obj = e.as_object_mut().unwrap();
        obj.remove("status");
        obj.remove("owner");
        let report = check(vec![e]);
        assert_eq!(report.errors, vec!["DEF-1: missing required fields: owner, status"]);
    }

    #[test]
    fn duplicate_ids_flagged() {
        let report = check(vec![entry("DEF-1"), entry("DEF-1")]);
        assert_eq!(report.errors, vec!["DEF-1: duplicate id"]);
    }

    #[test]
    fn field_shape_errors_collected() {
        let mut e = entry("DEF-1");
        let obj = e.as_object_mut().unwrap();
        obj.insert("risk_rank".into(), json!("P9"));
        obj.insert("owner".into(), json!(" "));
        obj.insert("linked_beads".into(), json!([]));
        obj.insert("compensating_controls".into(), json!(["ok", ""]));
        let report = check(vec![e]);
        assert_eq!(report.errors.len(), 4, "{:?}", report.errors);
        assert!(report.errors[0].contains("risk_rank must be one of [P0, P1, P2, P3]"));
    }

    #[test]
    fn date_rules() {
        let mut e = entry("DEF-1");
        let obj = e.as_object_mut().unwrap();
        obj.insert("created_on".into(), json!("2026-02-30"));
        obj.insert("revisit_on".into(), json!("03/01/2026"));
        obj.insert("expires_on".into(), json!("2026-02-01"));
        let report = check(vec![e]);
        assert_eq!(
            report.errors,
            vec![
                "DEF-1: created_on is not a valid date",
                "DEF-1: revisit_on must be YYYY-MM-DD",
                "DEF-1: expires_on=2026-02-01 is expired (today=2026-03-01)",
            ]
        );
    }

    #[test]
    fn revisit_before_created() {
        let mut e = entry("DEF-1");
        e.as_object_mut()
            .unwrap()
            .insert("revisit_on".into(), json!("2026-01-01"));
        let report = check(vec![e]);
        assert_eq!(report.errors, vec!["DEF-1: revisit_on must be on/after created_on"]);
    }

    #[test]
    fn non_object_entry() {
        let report = check(vec![json!("nope")]);
        assert_eq!(report.errors, vec!["entry[0] must be an object"]);
    }

    #[test]
    fn document_shape_errors() {
        let src = Path::new("defer.json");
        assert!(matches!(
            validate(&json!([]), src, today()).unwrap_err(),
            AuditError::NotAnObject(_)
        ));
        assert!(matches!(
            validate(&json!({"entries": {}}), src, today()).unwrap_err(),
            AuditError::MissingDeferEntries { field: "entries", .. }
        ));
        assert!(matches!(
            validate(&json!({}), src, today()).unwrap_err(),
            AuditError::MissingDeferEntries { .. }
        ));
    }
}
