//! Domain types for the assignment flow
//!
//! Wire names follow the web client: `taskName`, `assignTo`, `ambiguous[].options`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskstore::{TaskRecord, User};

/// Structured fields pulled out of one utterance
///
/// Transient: built by the extractor and consumed once by the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: String,
    /// Individual name tokens, already re-split on whitespace
    pub names: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One directory user offered as a choice for an ambiguous name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for Candidate {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A name token that matched more than one directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityRecord {
    /// The token as extracted
    pub name: String,
    /// Matching users, in directory order
    pub options: Vec<Candidate>,
}

/// Assignee as reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub name: String,
    pub email: String,
}

impl From<&User> for Assignee {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Summary of a created task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    #[serde(rename = "taskName")]
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "assignTo")]
    pub assignees: Vec<Assignee>,
}

impl TaskSummary {
    /// Build from the stored record and the users it was assigned to
    pub fn from_record(record: &TaskRecord, users: &[User]) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            start_date: record.start_date,
            end_date: record.end_date,
            assignees: users.iter().map(Assignee::from).collect(),
        }
    }
}
