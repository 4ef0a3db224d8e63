//! Operator CLI for the cinelog persistence layer.
//!
//! Usage:
//! - `cinelog ping` / `cinelog version`: linkage probes.
//! - `cinelog audit --config <FILE> [--prune]`: cross-store consistency audit.

use clap::{Args, Parser, Subcommand};
use cinelog_core::audit::AuditReport;
use cinelog_core::storage::Platform;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cinelog")]
#[command(about = "cinelog - dual-store persistence tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the core library links
    Ping,
    /// Print the core library version
    Version,
    /// Compare relational rows with document store contents
    Audit(AuditArgs),
}

#[derive(Debug, Args)]
struct AuditArgs {
    /// Path to the TOML config file
    #[arg(long)]
    config: PathBuf,

    /// Remove documents that have no relational row
    #[arg(long)]
    prune: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ping => {
            println!("cinelog_core ping={}", cinelog_core::ping());
            Ok(())
        }
        Commands::Version => {
            println!("cinelog_core version={}", cinelog_core::core_version());
            Ok(())
        }
        Commands::Audit(args) => execute_audit(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn execute_audit(args: AuditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = cinelog_core::load_config(&args.config)?;
    if let Some(logging) = config.logging.as_ref() {
        cinelog_core::init_logging(logging)?;
    }
    log::info!(
        "event=cli_audit module=cli status=start prune={}",
        args.prune
    );

    let platform = Platform::open(&config)?;
    let reports = cinelog_core::audit::run(&platform, args.prune)?;
    for report in &reports {
        print_report(report);
    }

    if reports.iter().all(AuditReport::is_consistent) {
        println!("all stores consistent");
    } else if !args.prune {
        println!("run with --prune to remove orphan documents");
    }
    Ok(())
}

fn print_report(report: &AuditReport) {
    println!(
        "{}: missing_documents={} orphan_documents={} pruned={}",
        report.kind,
        report.missing_documents.len(),
        report.orphan_documents.len(),
        report.pruned
    );
    for id in &report.missing_documents {
        println!("  missing document for row {id}");
    }
    for id in &report.orphan_documents {
        println!("  orphan document {id}");
    }
}
