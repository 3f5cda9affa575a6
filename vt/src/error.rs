//! Flow error types

use std::fmt;

use taskstore::StoreError;
use thiserror::Error;

use crate::llm::LlmError;

/// The identifier that failed to resolve to a directory user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Email(String),
    Name(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Email(email) => write!(f, "User with email '{}' not found.", email),
            UserRef::Name(name) => write!(f, "User '{}' not found.", name),
        }
    }
}

/// Errors that abort one extract-resolve-assemble invocation
///
/// Ambiguous names are not an error: they come back as
/// [`FlowOutcome::NeedsClarification`](crate::flow::FlowOutcome).
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("{0}")]
    UserNotFound(UserRef),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Extraction service error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl FlowError {
    /// Failures surfaced to callers without internal detail
    ///
    /// Malformed extraction is reported the same way: the caller cannot act on
    /// the model's raw output.
    pub fn is_unclassified(&self) -> bool {
        matches!(
            self,
            FlowError::MalformedExtraction(_) | FlowError::Llm(_) | FlowError::Store(_) | FlowError::Prompt(_)
        )
    }

    /// Message safe to show a caller
    pub fn public_message(&self) -> String {
        match self {
            FlowError::UserNotFound(user) => user.to_string(),
            FlowError::Validation(message) => message.clone(),
            _ => "Failed to parse and save task.".to_string(),
        }
    }
}
