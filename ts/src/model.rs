//! Record types stored by TaskStore

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered user in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUIDv7)
    pub id: String,

    /// Display name as registered
    pub name: String,

    /// Normalized email (trimmed, lower-case), unique
    pub email: String,

    /// Opaque credential, never sent back out
    #[serde(skip_serializing, default)]
    pub credential: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Input for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(alias = "password")]
    pub credential: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            credential: credential.into(),
        }
    }
}

/// A persisted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier (UUIDv7)
    pub id: String,

    /// Non-empty task title
    pub title: String,

    /// Assigned user ids, in assignment order
    pub assignees: Vec<String>,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub assignees: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
