use std::path::PathBuf;

/// Errors from loading audit inputs or writing audit outputs.
///
/// Every variant is fatal: the run aborts before any classification is
/// reported. An unresolved gap is not an error, see [`crate::GateVerdict`].
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSONL at {}:{line}: {message}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected JSON object in {}", .0.display())]
    NotAnObject(PathBuf),

    #[error("exemptions JSON must contain array field '{0}'")]
    MissingExemptionArray(&'static str),

    #[error("defer register {} must contain array field '{field}'", path.display())]
    MissingDeferEntries { path: PathBuf, field: &'static str },

    #[error("exemption row[{index}] {problem}")]
    InvalidExemption { index: usize, problem: String },

    #[error("duplicate exemption id: {0}")]
    DuplicateExemption(String),

    #[error("parity report missing rows array: {}", .0.display())]
    ReportMissingRows(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// Wrap an I/O error, mapping a missing file onto [`AuditError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// True when a referenced input document does not exist.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<config::ConfigError> for AuditError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = AuditError::io(
            "docs/RISK_REGISTER.md",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_missing_input());
        assert!(format!("{}", err).contains("docs/RISK_REGISTER.md"));
    }

    #[test]
    fn other_io_errors_keep_source() {
        let err = AuditError::io(
            "x.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_missing_input());
        assert!(matches!(err, AuditError::Io { .. }));
    }

    #[test]
    fn malformed_record_display_has_location() {
        let err = AuditError::MalformedRecord {
            path: PathBuf::from(".beads/issues.jsonl"),
            line: 7,
            message: "expected value".into(),
        };
        assert_eq!(
            format!("{}", err),
            "invalid JSONL at .beads/issues.jsonl:7: expected value"
        );
    }

    #[test]
    fn exemption_errors_display() {
        let e = AuditError::InvalidExemption {
            index: 2,
            problem: "has invalid id".into(),
        };
        assert_eq!(format!("{}", e), "exemption row[2] has invalid id");
        let e = AuditError::DuplicateExemption("bd-9".into());
        assert!(format!("{}", e).contains("bd-9"));
    }

    #[test]
    fn defer_shape_error_names_document() {
        let e = AuditError::MissingDeferEntries {
            path: PathBuf::from("docs/testing/defer.json"),
            field: "entries",
        };
        assert_eq!(
            format!("{}", e),
            "defer register docs/testing/defer.json must contain array field 'entries'"
        );
    }
}
