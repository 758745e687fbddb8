//! closure-audit CLI - bead closure evidence audit and CI gate
//!
//! - `audit`: classify every closed bead against the risk register
//! - `gate`: fail CI on unresolved, non-exempt evidence gaps
//! - `validate-defer`: check the deferred coverage waiver ledger

use clap::{Parser, Subcommand};
use closure_audit::AuditConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::InputArgs;

/// Exit code for load and configuration failures.
const EXIT_FATAL: u8 = 2;

/// Exit code for command-line usage errors (sysexits `EX_USAGE`), kept apart
/// from [`EXIT_FATAL`] which clap would otherwise share.
const EXIT_USAGE: u8 = 64;

/// closure-audit application
#[derive(Parser)]
#[command(name = "closure-audit")]
#[command(about = "Bead closure evidence audit and CI gate", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CLOSURE_AUDIT_CONFIG")]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Report timestamp override (YYYY-MM-DDTHH:MM:SSZ)
    #[arg(long, global = true)]
    generated_at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Classify closed beads and write the parity report
    Audit {
        #[command(flatten)]
        inputs: InputArgs,

        /// Report JSON output path
        #[arg(long)]
        output_json: Option<PathBuf>,

        /// Markdown summary output path; no summary is written without it
        #[arg(long)]
        output_markdown: Option<PathBuf>,
    },

    /// Run the audit and enforce closure evidence
    Gate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Exemption ledger path
        #[arg(long)]
        exemptions: Option<PathBuf>,

        /// Report JSON output path
        #[arg(long)]
        audit_output_json: Option<PathBuf>,

        /// Markdown summary output path
        #[arg(long)]
        audit_output_markdown: Option<PathBuf>,

        /// Skip the markdown summary
        #[arg(long, conflicts_with = "audit_output_markdown")]
        no_markdown: bool,
    },

    /// Validate the deferred coverage waiver ledger
    ValidateDefer {
        /// Ledger path (defaults to the configured defer register)
        path: Option<PathBuf>,

        /// Date expiry is checked against (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut config = match AuditConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };
    if let Some(at) = cli.generated_at {
        config.report.generated_at = at;
    }

    init_tracing(&config, cli.verbose, cli.log_json);
    tracing::debug!(file = ?cli.config, generated_at = %config.report.generated_at, "configuration loaded");

    let result = match cli.command {
        Commands::Audit {
            inputs,
            output_json,
            output_markdown,
        } => {
            inputs.apply(&mut config);
            if let Some(path) = output_json {
                config.outputs.report_json = path;
            }
            config.outputs.report_markdown = output_markdown;
            commands::audit(&config)
        }
        Commands::Gate {
            inputs,
            exemptions,
            audit_output_json,
            audit_output_markdown,
            no_markdown,
        } => {
            inputs.apply(&mut config);
            if let Some(path) = exemptions {
                config.inputs.exemptions = path;
            }
            if let Some(path) = audit_output_json {
                config.outputs.report_json = path;
            }
            if let Some(path) = audit_output_markdown {
                config.outputs.report_markdown = Some(path);
            }
            if no_markdown {
                config.outputs.report_markdown = None;
            }
            commands::gate(&config)
        }
        Commands::ValidateDefer { path, today } => {
            let path = path.unwrap_or_else(|| config.inputs.defer_register.clone());
            let today = today.unwrap_or_else(|| chrono::Utc::now().date_naive());
            commands::validate_defer(&path, today)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Logs go to stderr; stdout carries the CI lines.
fn init_tracing(config: &AuditConfig, verbose: bool, log_json: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if log_json || config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
