use crate::error::{AuditError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Array field of the exemption ledger document.
pub const EXEMPTION_FIELD: &str = "exempt_gap_beads";

/// Gap ids accepted as intentionally unresolved, each with a rationale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExemptionLedger {
    entries: BTreeMap<String, String>,
}

impl ExemptionLedger {
    /// Validate a parsed ledger document.
    ///
    /// Rejects empty or non-string ids and rationales and duplicate ids;
    /// nothing is silently dropped. Rationales are stored trimmed.
    pub fn from_value(value: &Value, source: &Path) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| AuditError::NotAnObject(source.to_path_buf()))?;
        let rows = object
            .get(EXEMPTION_FIELD)
            .and_then(Value::as_array)
            .ok_or(AuditError::MissingExemptionArray(EXEMPTION_FIELD))?;

        let mut entries = BTreeMap::new();
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_object().ok_or_else(|| AuditError::InvalidExemption {
                index,
                problem: "must be an object".into(),
            })?;
            let id = match row.get("id").and_then(Value::as_str) {
                Some(id) if !id.trim().is_empty() => id,
                _ => {
                    return Err(AuditError::InvalidExemption {
                        index,
                        problem: "has invalid id".into(),
                    })
                }
            };
            let rationale = match row.get("rationale").and_then(Value::as_str) {
                Some(r) if !r.trim().is_empty() => r.trim(),
                _ => {
                    return Err(AuditError::InvalidExemption {
                        index,
                        problem: "has invalid rationale".into(),
                    })
                }
            };
            if entries.contains_key(id) {
                return Err(AuditError::DuplicateExemption(id.to_string()));
            }
            entries.insert(id.to_string(), rationale.to_string());
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let value: Value = serde_json::from_str(&text).map_err(|source| AuditError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
        let ledger = Self::from_value(&value, path)?;
        tracing::debug!(path = %path.display(), exemptions = ledger.len(), "loaded exemption ledger");
        Ok(ledger)
    }

    /// Exempted ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn rationale(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I, S> FromIterator<(I, S)> for ExemptionLedger
where
    I: Into<String>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, S)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, rationale)| (id.into(), rationale.into()))
                .collect(),
        }
    }
}
