use crate::error::{AuditError, Result};
use crate::patterns::{exact_heading_needle, parse_heading};
use std::path::Path;

/// Read-only view over the evidence document (the risk register).
///
/// Keeps the raw text for the whole-document exact-id test and the ordered
/// heading list for milestone lookups.
#[derive(Clone, Debug, Default)]
pub struct EvidenceIndex {
    text: String,
    headings: Vec<String>,
}

impl EvidenceIndex {
    /// Build the index from the evidence text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let headings = text
            .lines()
            .filter_map(parse_heading)
            .map(str::to_string)
            .collect();
        Self { text, headings }
    }

    /// Read and index the evidence document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let index = Self::from_text(text);
        tracing::debug!(
            path = %path.display(),
            headings = index.headings.len(),
            "indexed evidence document"
        );
        Ok(index)
    }

    /// Headings in document order.
    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    /// True if `## <id> ` occurs anywhere in the raw text.
    ///
    /// Not line-scoped: the needle also matches outside a heading line.
    pub fn has_exact(&self, id: &str) -> bool {
        self.text.contains(&exact_heading_needle(id))
    }

    /// True if some heading starts with `<token> `.
    pub fn has_milestone(&self, token: &str) -> bool {
        let prefix = format!("{} ", token);
        self.headings.iter().any(|h| h.starts_with(&prefix))
    }
}
