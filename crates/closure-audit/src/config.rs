//! Configuration for audit runs

use crate::error::{AuditError, Result};
use crate::report::TIMESTAMP_FORMAT;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment prefix for overrides, e.g. `CLOSURE_AUDIT_INPUTS__RISK_REGISTER`.
pub const ENV_PREFIX: &str = "CLOSURE_AUDIT";

/// Timestamp written into reports unless overridden. Fixed so unchanged
/// inputs always produce byte-identical reports.
pub const DEFAULT_GENERATED_AT: &str = "2026-02-18T00:00:00Z";

/// Main audit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Input document paths
    #[serde(default)]
    pub inputs: InputPaths,

    /// Output artifact paths
    #[serde(default)]
    pub outputs: OutputPaths,

    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPaths {
    /// Bead ledger (JSON lines)
    #[serde(default = "default_issues_jsonl")]
    pub issues_jsonl: PathBuf,

    /// Evidence document
    #[serde(default = "default_risk_register")]
    pub risk_register: PathBuf,

    /// Exemption ledger
    #[serde(default = "default_exemptions")]
    pub exemptions: PathBuf,

    /// Deferred coverage waiver ledger
    #[serde(default = "default_defer_register")]
    pub defer_register: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            issues_jsonl: default_issues_jsonl(),
            risk_register: default_risk_register(),
            exemptions: default_exemptions(),
            defer_register: default_defer_register(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// JSON parity report
    #[serde(default = "default_report_json")]
    pub report_json: PathBuf,

    /// Markdown summary; skipped when unset
    #[serde(default)]
    pub report_markdown: Option<PathBuf>,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            report_json: default_report_json(),
            report_markdown: Some(default_report_markdown()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default = "default_generated_at")]
    pub generated_at: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            generated_at: default_generated_at(),
        }
    }
}

impl ReportConfig {
    pub fn generated_at(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.generated_at)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_issues_jsonl() -> PathBuf {
    PathBuf::from(".beads/issues.jsonl")
}

fn default_risk_register() -> PathBuf {
    PathBuf::from("docs/RISK_REGISTER.md")
}

fn default_exemptions() -> PathBuf {
    PathBuf::from("docs/testing/bead-closure-evidence-exemptions-v0.1.json")
}

fn default_defer_register() -> PathBuf {
    PathBuf::from("docs/testing/defer-register-v0.1.json")
}

fn default_report_json() -> PathBuf {
    PathBuf::from(".tmp/bead-closure-evidence/bead-risk-parity-audit.json")
}

fn default_report_markdown() -> PathBuf {
    PathBuf::from(".tmp/bead-closure-evidence/bead-risk-parity-audit.md")
}

fn default_generated_at() -> String {
    DEFAULT_GENERATED_AT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AuditError::Config(format!("invalid generated_at '{}': {}", raw, e)))
}

impl AuditConfig {
    /// Layer defaults, an optional config file, then `CLOSURE_AUDIT_*`
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&AuditConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.report.generated_at()?;
        Ok(config)
    }
}
