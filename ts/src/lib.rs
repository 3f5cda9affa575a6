//! TaskStore - SQLite persistence for voicetask
//!
//! Holds the two record kinds the assignment flow touches: the user
//! directory (looked up by email or by name) and created tasks.
//!
//! # Layout
//!
//! ```text
//! users  (id, name, name_folded, email UNIQUE, credential, created_at)
//! tasks  (id, title, assignees JSON, start_date, end_date, created_at)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use taskstore::{NewUser, Store};
//!
//! let store = Store::open("voicetask.db")?;
//! store.create_user(NewUser::new("Alice", "alice@example.com", "secret"))?;
//! let matches = store.users_by_name("ALICE")?;
//! ```

mod error;
mod migrations;
mod model;
mod store;

pub use error::{StoreError, StoreResult};
pub use migrations::latest_version;
pub use model::{NewTask, NewUser, TaskRecord, User};
pub use store::Store;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize an email for storage and lookup (trim + lower-case)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fold a display name for case-insensitive exact matching
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}
