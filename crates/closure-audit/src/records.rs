//! Bead ledger loading and the parent -> children index.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Status value that admits a record into the audit.
pub const CLOSED_STATUS: &str = "closed";

/// Dependency edge type that links a child to its parent.
pub const PARENT_CHILD_EDGE: &str = "parent-child";

/// Record category. Only [`RecordKind::Feature`] aggregates children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    Task,
    Bug,
    Chore,
    Epic,
    Feature,
    /// Any kind the audit does not interpret, kept verbatim.
    Other(String),
}

impl RecordKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Other(s) => s,
        }
    }

    /// Whether records of this kind participate in parent rollup.
    pub fn is_aggregating(&self) -> bool {
        matches!(self, Self::Feature)
    }
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for RecordKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "task" => Self::Task,
            "bug" => Self::Bug,
            "chore" => Self::Chore,
            "epic" => Self::Epic,
            "feature" => Self::Feature,
            _ => Self::Other(s),
        }
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed dependency edge; the target is this record's parent for
/// `parent-child` edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "type", alias = "edge_type", default)]
    pub edge_type: String,
    #[serde(rename = "depends_on_id", alias = "target_id", default)]
    pub target_id: String,
}

impl Dependency {
    pub fn is_parent_link(&self) -> bool {
        self.edge_type == PARENT_CHILD_EDGE && !self.target_id.is_empty()
    }
}

/// One unit of work from the bead ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "issue_type", alias = "kind", default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub close_reason: String,
}

impl Record {
    pub fn is_closed(&self) -> bool {
        self.status == CLOSED_STATUS
    }

    /// Parent ids named by this record's `parent-child` edges.
    pub fn parent_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| d.is_parent_link())
            .map(|d| d.target_id.as_str())
    }
}

/// Parent id -> sorted, deduplicated child ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildIndex {
    children: BTreeMap<String, Vec<String>>,
}

impl ChildIndex {
    /// Build the index from every record, whatever its status.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in records {
            for parent in record.parent_ids() {
                sets.entry(parent.to_string())
                    .or_default()
                    .insert(record.id.clone());
            }
        }
        Self {
            children: sets
                .into_iter()
                .map(|(parent, kids)| (parent, kids.into_iter().collect()))
                .collect(),
        }
    }

    /// Children of `parent`; empty when it has none.
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_count(&self) -> usize {
        self.children.len()
    }
}

/// Immutable snapshot of the bead ledger.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    children: ChildIndex,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        let children = ChildIndex::build(&records);
        Self { records, children }
    }

    /// Parse line-delimited JSON records. Blank lines are skipped; the first
    /// malformed line aborts the whole load.
    pub fn parse(text: &str, source: &Path) -> Result<Self> {
        let mut records = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: Record =
                serde_json::from_str(trimmed).map_err(|e| AuditError::MalformedRecord {
                    path: source.to_path_buf(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(Self::new(records))
    }

    /// Load the ledger at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let store = Self::parse(&text, path)?;
        tracing::debug!(
            path = %path.display(),
            records = store.records.len(),
            parents = store.children.parent_count(),
            "loaded record ledger"
        );
        Ok(store)
    }

    /// All records in ledger order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Closed records sorted by id.
    pub fn closed(&self) -> Vec<&Record> {
        let mut closed: Vec<&Record> = self.records.iter().filter(|r| r.is_closed()).collect();
        closed.sort_by(|a, b| a.id.cmp(&b.id));
        closed
    }

    pub fn children(&self) -> &ChildIndex {
        &self.children
    }
}
