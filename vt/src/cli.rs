//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// voicetask - turn a spoken task description into an assigned task
#[derive(Parser)]
#[command(
    name = "vt",
    about = "Turn a spoken task description into an assigned, persisted task",
    version,
    after_help = log_path_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract, resolve and save a task from free text
    Parse {
        /// The task description, as spoken
        text: String,

        /// Assignee email; repeat to pick users for ambiguous names
        #[arg(short, long = "email", value_name = "EMAIL")]
        emails: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the HTTP server
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage directory users
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },

    /// Show a stored task
    Task {
        /// Task id
        id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// User directory subcommands
#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Register a user
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// List registered users
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text, json", s))
            }
        }
    }
}

/// How a command finished
///
/// `main` turns this into the process exit status once the runtime has shut
/// down. Failures travel separately as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// A name matched several users; re-run with `--email`
    NeedsClarification,
}

impl CommandOutcome {
    pub fn status(self) -> u8 {
        match self {
            Self::Done => 0,
            Self::NeedsClarification => 2,
        }
    }
}

impl From<CommandOutcome> for ExitCode {
    fn from(outcome: CommandOutcome) -> Self {
        ExitCode::from(outcome.status())
    }
}

/// Location of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicetask")
        .join("logs")
        .join("voicetask.log")
}

fn log_path_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}
