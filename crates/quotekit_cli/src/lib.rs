//! `quotekit_cli` v1:
//! Command-line front end wiring the engine to workbook, CSV and SMTP
//! adapters.
//!
//! Modules:
//! - `config`  : YAML application configuration
//! - `command` : subcommand bodies
//! - `notify`  : `SmtpNotifier`

pub mod command;
pub mod config;
pub mod notify;

pub use command::{
    SpecBackupArgs, SpecGenerateArgs, run_backup, run_check_config, run_generate, run_history,
};
pub use config::{SpecAppConfig, SpecAppConfigRaw};
pub use notify::SmtpNotifier;
