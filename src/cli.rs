use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::commands;
use crate::commands::CommandReport;
use crate::commands::download::DownloadOptions;
use crate::commands::status::StatusOptions;
use crate::commands::validate::ValidateOptions;

#[derive(Debug, Parser)]
#[command(
    name = "mecaudit",
    version,
    about = "Archive, reconcile, and validate campaign-finance filing PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover expected reports, drive the download loop, then validate.
    Download(DownloadArgs),
    /// Check archived filenames against the filing dates inside the PDFs.
    Validate(ValidateArgs),
    /// Show resolved paths, tool availability, and archive integrity.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("search").required(true)))]
struct DownloadArgs {
    /// Committee name to search for.
    #[arg(long, group = "search")]
    committee: Option<String>,

    /// Candidate name to search for.
    #[arg(long, group = "search")]
    candidate: Option<String>,

    /// Search by MEC committee id alone.
    #[arg(long, value_name = "MECID", group = "search")]
    mecid_only: Option<String>,

    /// Known MECID used to pin the subject folder for name searches.
    #[arg(long)]
    mecid: Option<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// MEC committee id whose archive folder should be validated.
    #[arg(long)]
    mecid: String,
}

#[derive(Debug, Args)]
struct StatusArgs {
    /// Restrict the integrity sweep to one MECID folder.
    #[arg(long)]
    mecid: Option<String>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match cli.command {
        Command::Download(args) => commands::download::run(&DownloadOptions {
            committee: args.committee,
            candidate: args.candidate,
            mecid_only: args.mecid_only,
            mecid: args.mecid,
        })?,
        Command::Validate(args) => commands::validate::run(&ValidateOptions { mecid: args.mecid })?,
        Command::Status(args) => commands::status::run(&StatusOptions { mecid: args.mecid })?,
    };
    print_report(&report)
}

fn print_report(report: &CommandReport) -> Result<()> {
    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    if report.ok {
        Ok(())
    } else {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        )
    }
}
