//! voicetask - spoken task descriptions to assigned tasks
//!
//! CLI entry point for the parse flow, the HTTP server and the user directory.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, error, info};

use taskstore::{NewUser, Store};
use voicetask::cli::{Cli, Command, CommandOutcome, OutputFormat, UsersCommand};
use voicetask::config::Config;
use voicetask::domain::{AmbiguityRecord, TaskSummary};
use voicetask::extract::Extractor;
use voicetask::flow::{FlowOutcome, TaskAssistant, TaskRequest};
use voicetask::llm::create_client;
use voicetask::prompts::PromptLoader;
use voicetask::server::{self, AppState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicetask")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("voicetask.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, db = %config.storage.db_path.display(), "voicetask loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    let outcome = match cli.command {
        Command::Parse { text, emails, format } => cmd_parse(&config, text, emails, format).await?,
        Command::Serve { bind } => {
            cmd_serve(&config, bind).await?;
            CommandOutcome::Done
        }
        Command::Users { command } => {
            match command {
                UsersCommand::Add { name, email, password } => cmd_users_add(&config, name, email, password)?,
                UsersCommand::List { format } => cmd_users_list(&config, format)?,
            }
            CommandOutcome::Done
        }
        Command::Task { id, format } => {
            cmd_task(&config, &id, format)?;
            CommandOutcome::Done
        }
    };

    debug!(?outcome, "main: command finished");
    Ok(outcome.into())
}

fn open_store(config: &Config) -> Result<Arc<Store>> {
    let store = Store::open(&config.storage.db_path)
        .with_context(|| format!("Failed to open store at {}", config.storage.db_path.display()))?;
    Ok(Arc::new(store))
}

fn build_assistant(config: &Config, store: Arc<Store>) -> Result<TaskAssistant> {
    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let extractor = Extractor::new(llm, PromptLoader::new(root)).with_max_tokens(config.llm.max_tokens);
    Ok(TaskAssistant::with_store(extractor, store))
}

// =============================================================================
// Commands
// =============================================================================

async fn cmd_parse(
    config: &Config,
    text: String,
    emails: Vec<String>,
    format: OutputFormat,
) -> Result<CommandOutcome> {
    debug!(%text, ?emails, ?format, "cmd_parse: called");
    let store = open_store(config)?;
    let assistant = build_assistant(config, store)?;
    let today = chrono::Local::now().date_naive();

    let outcome = assistant
        .handle(TaskRequest::new(text).with_emails(emails), today)
        .await
        .map_err(|e| {
            error!(error = %e, "Parse failed");
            eyre!(e.public_message())
        })?;

    match outcome {
        FlowOutcome::Created(summary) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => print_summary(&summary),
            }
            Ok(CommandOutcome::Done)
        }
        FlowOutcome::NeedsClarification(records) => {
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "message": "Multiple users found for some names. Please clarify.",
                        "ambiguous": records,
                    }))?
                ),
                OutputFormat::Text => print_ambiguity(&records),
            }
            Ok(CommandOutcome::NeedsClarification)
        }
    }
}

async fn cmd_serve(config: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    debug!(%bind, "cmd_serve: called");
    let store = open_store(config)?;
    let assistant = build_assistant(config, store.clone())?;

    println!("{} Listening on http://{}", "✓".green(), bind.cyan());
    server::serve(&bind, AppState::new(assistant, store)).await
}

fn cmd_users_add(config: &Config, name: String, email: String, password: String) -> Result<()> {
    debug!(%name, %email, "cmd_users_add: called");
    let store = open_store(config)?;
    let user = store
        .create_user(NewUser::new(name, email, password))
        .context("Failed to register user")?;
    println!("{} Registered {} <{}> ({})", "✓".green(), user.name.bold(), user.email, user.id.dimmed());
    Ok(())
}

fn cmd_users_list(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_users_list: called");
    let store = open_store(config)?;
    let users = store.list_users()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&users)?),
        OutputFormat::Text => {
            if users.is_empty() {
                println!("No users registered");
            }
            for user in users {
                println!("{} {} <{}>", user.id.dimmed(), user.name.bold(), user.email);
            }
        }
    }
    Ok(())
}

fn cmd_task(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    debug!(%id, ?format, "cmd_task: called");
    let store = open_store(config)?;
    let record = store.get_task(id)?.ok_or_else(|| eyre!("Task '{}' not found.", id))?;

    let mut users = Vec::with_capacity(record.assignees.len());
    for user_id in &record.assignees {
        match store.user_by_id(user_id)? {
            Some(user) => users.push(user),
            None => debug!(%user_id, "cmd_task: assignee no longer in directory"),
        }
    }

    let summary = TaskSummary::from_record(&record, &users);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn print_summary(summary: &TaskSummary) {
    println!("{} {}", "✓".green(), summary.title.bold());
    println!("  {} {}", "id:".dimmed(), summary.id);
    println!("  {} {} → {}", "dates:".dimmed(), summary.start_date, summary.end_date);
    for assignee in &summary.assignees {
        println!("  {} {} <{}>", "assignee:".dimmed(), assignee.name, assignee.email);
    }
}

fn print_ambiguity(records: &[AmbiguityRecord]) {
    println!("{} Multiple users found for some names. Please clarify.", "?".yellow());
    for record in records {
        println!("  {}", record.name.bold());
        for option in &record.options {
            println!("    {} <{}>", option.name, option.email.cyan());
        }
    }
    println!("Re-run with --email for each name you meant.");
}
