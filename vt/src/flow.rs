//! The inbound operation: utterance in, task or clarification out
//!
//! Runs sequentially per request: extract, resolve, assemble. Nothing is
//! written until resolution and validation have both succeeded, so every
//! failure leaves the store untouched.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskstore::Store;
use tracing::{debug, info};

use crate::assemble::{TaskSink, assemble_task};
use crate::domain::{AmbiguityRecord, TaskSummary};
use crate::error::FlowError;
use crate::extract::Extractor;
use crate::resolve::{Resolution, UserDirectory, resolve_assignees};

/// Explicit assignee emails: one address or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmailInput {
    One(String),
    Many(Vec<String>),
}

impl EmailInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            EmailInput::One(email) => vec![email],
            EmailInput::Many(emails) => emails,
        }
    }
}

/// One request to turn text into a task
///
/// A clarification is sent as a fresh request carrying the original text
/// plus the emails picked for each ambiguous name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailInput>,
}

impl TaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            email: None,
        }
    }

    pub fn with_emails(mut self, emails: Vec<String>) -> Self {
        self.email = (!emails.is_empty()).then_some(EmailInput::Many(emails));
        self
    }

    fn emails(&self) -> Vec<String> {
        self.email.clone().map(EmailInput::into_vec).unwrap_or_default()
    }
}

/// Non-error outcomes of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Created(TaskSummary),
    NeedsClarification(Vec<AmbiguityRecord>),
}

/// Runs the extract-resolve-assemble flow against injected capabilities
pub struct TaskAssistant {
    extractor: Extractor,
    directory: Arc<dyn UserDirectory>,
    tasks: Arc<dyn TaskSink>,
}

impl TaskAssistant {
    pub fn new(extractor: Extractor, directory: Arc<dyn UserDirectory>, tasks: Arc<dyn TaskSink>) -> Self {
        Self {
            extractor,
            directory,
            tasks,
        }
    }

    /// Use one store as both the directory and the task sink
    pub fn with_store(extractor: Extractor, store: Arc<Store>) -> Self {
        Self::new(extractor, store.clone(), store)
    }

    /// Handle one request, with `today` as the invocation date
    pub async fn handle(&self, request: TaskRequest, today: NaiveDate) -> Result<FlowOutcome, FlowError> {
        debug!(text_len = request.text.len(), email = ?request.email, %today, "TaskAssistant::handle: called");
        let text = request.text.trim();
        if text.is_empty() {
            return Err(FlowError::Validation("Text is required.".to_string()));
        }

        let extraction = self.extractor.extract(text, today).await?;
        let resolution = resolve_assignees(self.directory.as_ref(), &request.emails(), &extraction.names).await?;

        let users = match resolution {
            Resolution::Resolved(users) => users,
            Resolution::Ambiguous(records) => {
                info!(count = records.len(), "Returning ambiguous names for clarification");
                return Ok(FlowOutcome::NeedsClarification(records));
            }
        };

        let summary = assemble_task(
            self.tasks.as_ref(),
            &extraction.title,
            &users,
            extraction.start_date,
            extraction.end_date,
            today,
        )
        .await?;
        Ok(FlowOutcome::Created(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use taskstore::NewUser;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn assistant(store: Arc<Store>, llm: Arc<MockLlmClient>) -> TaskAssistant {
        TaskAssistant::with_store(Extractor::new(llm, PromptLoader::embedded_only()), store)
    }

    #[test]
    fn test_email_input_shapes() {
        let one: TaskRequest = serde_json::from_str(r#"{"text":"t","email":"a@x.com"}"#).unwrap();
        assert_eq!(one.emails(), vec!["a@x.com"]);

        let many: TaskRequest = serde_json::from_str(r#"{"text":"t","email":["a@x.com","b@x.com"]}"#).unwrap();
        assert_eq!(many.emails(), vec!["a@x.com", "b@x.com"]);

        let none: TaskRequest = serde_json::from_str(r#"{"text":"t","email":null}"#).unwrap();
        assert!(none.emails().is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_extraction() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let llm = Arc::new(MockLlmClient::new(vec![]));

        let err = assistant(store, llm.clone())
            .handle(TaskRequest::new("   "), today())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_creates_task() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.create_user(NewUser::new("Alice", "alice@example.com", "pw")).unwrap();
        let llm = Arc::new(MockLlmClient::replying(
            r#"{"title":"Fix login","assignTo":["Alice"],"startdate":"","enddate":""}"#,
        ));

        let outcome = assistant(store.clone(), llm)
            .handle(TaskRequest::new("Alice should fix login"), today())
            .await
            .unwrap();
        let FlowOutcome::Created(summary) = outcome else {
            panic!("expected a created task");
        };
        assert_eq!(summary.start_date, today());
        assert_eq!(summary.end_date, today());
        assert_eq!(store.count_tasks().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_extraction_persists_nothing() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let llm = Arc::new(MockLlmClient::replying("I could not understand that."));

        let err = assistant(store.clone(), llm)
            .handle(TaskRequest::new("mumble"), today())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::MalformedExtraction(_)));
        assert!(err.is_unclassified());
        assert_eq!(store.count_tasks().unwrap(), 0);
    }
}
