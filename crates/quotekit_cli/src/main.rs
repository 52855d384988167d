use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quotekit_cli::{
    SpecBackupArgs, SpecGenerateArgs, run_backup, run_check_config, run_generate, run_history,
};

#[derive(Debug, Parser)]
#[command(name = "quotekit", version, about = "Estimate and invoice generator")]
struct Cli {
    /// Log filter; overrides QUOTEKIT_LOG and RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: EnumCommand,
}

#[derive(Debug, Subcommand)]
enum EnumCommand {
    /// Render, save and record one document from an input workbook.
    Generate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        input: PathBuf,
        /// Email the document to the address on the form.
        #[arg(long)]
        notify: bool,
        /// Render in memory only.
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration file.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
    /// Copy the document folders into the backup folder.
    Backup {
        #[arg(long)]
        config: PathBuf,
        /// Glob on file names; repeatable.
        #[arg(long = "pattern")]
        patterns: Vec<String>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the dispatch history.
    History {
        #[arg(long)]
        config: PathBuf,
    },
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        EnumCommand::Generate {
            config,
            input,
            notify,
            dry_run,
        } => {
            let report = run_generate(
                &config,
                &input,
                SpecGenerateArgs {
                    if_notify: notify,
                    if_dry_run: dry_run,
                },
            )?;
            println!("{report}");
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
            println!("  location: {}", report.document_location);
            if report.outcome.is_flagged() {
                return Ok(ExitCode::from(2));
            }
        }
        EnumCommand::CheckConfig { config } => {
            for line in run_check_config(&config)? {
                println!("{line}");
            }
            println!("ok");
        }
        EnumCommand::Backup {
            config,
            patterns,
            workers,
            dry_run,
        } => {
            let report = run_backup(
                &config,
                &SpecBackupArgs {
                    patterns,
                    num_workers_max: workers,
                    if_dry_run: dry_run,
                },
            )?;
            println!("{report}");
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
            for error in &report.errors {
                println!("  error: {} ({})", error.path.display(), error.exception);
            }
            if report.error_count() > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        EnumCommand::History { config } => {
            let table = run_history(&config)?;
            println!("{}", table.headers.join("\t"));
            for row in &table.rows {
                println!("{}", row.join("\t"));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    quotekit_log::init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
