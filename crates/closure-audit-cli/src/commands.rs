//! Subcommand handlers. Each returns the process exit code on success.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use closure_audit::{defer, diagnostics, run_audit, run_gate, ArtifactRefs, AuditConfig};
use std::path::{Path, PathBuf};

/// Input documents shared by `audit` and `gate`.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Bead ledger (JSON lines)
    #[arg(long)]
    pub issues_jsonl: Option<PathBuf>,

    /// Risk register (markdown)
    #[arg(long)]
    pub risk_register: Option<PathBuf>,
}

impl InputArgs {
    pub fn apply(self, config: &mut AuditConfig) {
        if let Some(path) = self.issues_jsonl {
            config.inputs.issues_jsonl = path;
        }
        if let Some(path) = self.risk_register {
            config.inputs.risk_register = path;
        }
    }
}

pub fn audit(config: &AuditConfig) -> Result<u8> {
    let report = run_audit(config).context("parity audit failed")?;

    println!(
        "PARITY_AUDIT_OK closed={} action_required={} json={}",
        report.summary.closed_total,
        report.summary.action_required,
        config.outputs.report_json.display()
    );
    if let Some(md) = &config.outputs.report_markdown {
        println!("PARITY_AUDIT_OK markdown={}", md.display());
    }
    Ok(0)
}

pub fn gate(config: &AuditConfig) -> Result<u8> {
    let outcome = run_gate(config).context("closure evidence gate failed to run")?;

    let artifacts = ArtifactRefs {
        report_json: config.outputs.report_json.display().to_string(),
        report_markdown: config
            .outputs
            .report_markdown
            .as_ref()
            .map(|p| p.display().to_string()),
        replay: replay_command(config),
    };
    for line in diagnostics(&outcome.reconciliation, &artifacts) {
        println!("{}", line);
    }
    Ok(outcome.verdict().exit_code())
}

fn replay_command(config: &AuditConfig) -> String {
    let mut cmd = format!(
        "closure-audit gate --issues-jsonl {} --risk-register {} --exemptions {} --audit-output-json {}",
        config.inputs.issues_jsonl.display(),
        config.inputs.risk_register.display(),
        config.inputs.exemptions.display(),
        config.outputs.report_json.display()
    );
    match &config.outputs.report_markdown {
        Some(md) => cmd.push_str(&format!(" --audit-output-markdown {}", md.display())),
        None => cmd.push_str(" --no-markdown"),
    }
    cmd
}

pub fn validate_defer(path: &Path, today: NaiveDate) -> Result<u8> {
    let report = defer::validate_file(path, today)
        .with_context(|| format!("cannot validate defer register {}", path.display()))?;

    if !report.is_valid() {
        eprintln!("defer-register validation failed:");
        for error in &report.errors {
            eprintln!("- {}", error);
        }
        return Ok(1);
    }
    println!("defer-register validation passed ({} entries)", report.entries);
    Ok(0)
}
