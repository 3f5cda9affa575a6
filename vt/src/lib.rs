//! voicetask - spoken task descriptions to assigned, persisted tasks
//!
//! A caller sends free text such as "Schedule a review with Alice and Bob
//! tomorrow". One extraction-service call turns it into a title, name tokens
//! and dates; the names are resolved against the user directory; and a single
//! task record is written.
//!
//! # Flow
//!
//! text → [`extract`] → [`resolve`] → [`assemble`] → [`domain::TaskSummary`]
//!
//! Resolution halts with a list of [`domain::AmbiguityRecord`]s when a name
//! matches more than one user. The caller clarifies by re-sending the same
//! text together with the chosen emails.
//!
//! # Modules
//!
//! - [`llm`] - extraction-service client trait and providers
//! - [`prompts`] - extraction prompt template loading
//! - [`flow`] - the inbound operation tying everything together
//! - [`server`] - HTTP surface
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod assemble;
pub mod blocking;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod flow;
pub mod llm;
pub mod prompts;
pub mod resolve;
pub mod server;

// Re-export commonly used types
pub use assemble::{TaskSink, assemble_task, resolve_dates};
pub use config::{Config, LlmConfig};
pub use domain::{AmbiguityRecord, Assignee, Candidate, ExtractionResult, TaskSummary};
pub use error::{FlowError, UserRef};
pub use extract::{Extractor, parse_extraction, split_name_tokens, strip_code_fences};
pub use flow::{EmailInput, FlowOutcome, TaskAssistant, TaskRequest};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use prompts::PromptLoader;
pub use resolve::{Resolution, UserDirectory, resolve_assignees};
pub use server::{AppState, router};
