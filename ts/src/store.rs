//! Core Store implementation

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::migrations::apply_migrations;
use crate::model::{NewTask, NewUser, TaskRecord, User};
use crate::{fold_name, normalize_email, now_ms};

const USER_SELECT_SQL: &str = "SELECT id, name, email, credential, created_at FROM users";

const TASK_SELECT_SQL: &str = "SELECT id, title, assignees, start_date, end_date, created_at FROM tasks";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed user directory and task store
///
/// The connection sits behind a shared mutex; clones are handles onto the
/// same database. Every operation is a blocking call, so async callers move a
/// clone onto a blocking thread instead of locking from a runtime worker.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) a store at the given path and apply migrations
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let started_at = Instant::now();
        debug!(?path, "Store::open: called");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::InvalidData(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let mut conn = Connection::open(&path)?;
        bootstrap_connection(&mut conn)?;

        info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Opened task store"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store (tests and one-shot runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("Store::open_in_memory: called");
        let mut conn = Connection::open_in_memory()?;
        bootstrap_connection(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a new user
    ///
    /// Email is normalized before the uniqueness check, so `Alice@X.com` and
    /// `alice@x.com` are the same account.
    pub fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let name = new_user.name.trim().to_string();
        let email = normalize_email(&new_user.email);
        debug!(%name, %email, "Store::create_user: called");

        if name.is_empty() {
            return Err(StoreError::InvalidRecord("name is required".to_string()));
        }
        if email.is_empty() {
            return Err(StoreError::InvalidRecord("email is required".to_string()));
        }
        if new_user.credential.is_empty() {
            return Err(StoreError::InvalidRecord("password is required".to_string()));
        }

        let user = User {
            id: Uuid::now_v7().to_string(),
            name,
            email,
            credential: new_user.credential,
            created_at: now_ms(),
        };

        let conn = self.conn()?;
        let exists: Option<String> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", params![user.email], |row| row.get(0))
            .optional()?;
        if exists.is_some() {
            debug!(email = %user.email, "Store::create_user: email already registered");
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let result = conn.execute(
            "INSERT INTO users (id, name, name_folded, email, credential, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                fold_name(&user.name),
                user.email,
                user.credential,
                user.created_at
            ],
        );

        match result {
            Ok(_) => {
                info!(id = %user.id, email = %user.email, "Registered user");
                Ok(user)
            }
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateEmail(user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by exact (normalized) email
    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        debug!(%email, "Store::user_by_email: called");
        let conn = self.conn()?;
        let user = conn
            .query_row(&format!("{USER_SELECT_SQL} WHERE email = ?1"), params![email], map_user)
            .optional()?;
        Ok(user)
    }

    pub fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        debug!(%id, "Store::user_by_id: called");
        let conn = self.conn()?;
        let user = conn
            .query_row(&format!("{USER_SELECT_SQL} WHERE id = ?1"), params![id], map_user)
            .optional()?;
        Ok(user)
    }

    /// Look up users whose name matches case-insensitively, in insertion order
    pub fn users_by_name(&self, name: &str) -> StoreResult<Vec<User>> {
        let folded = fold_name(name);
        debug!(%folded, "Store::users_by_name: called");
        if folded.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE name_folded = ?1 ORDER BY rowid"))?;
        let users = stmt
            .query_map(params![folded], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = users.len(), "Store::users_by_name: matched");
        Ok(users)
    }

    /// List every registered user, in insertion order
    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        debug!("Store::list_users: called");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} ORDER BY rowid"))?;
        let users = stmt.query_map([], map_user)?.collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Persist a new task as a single row
    pub fn create_task(&self, new_task: NewTask) -> StoreResult<TaskRecord> {
        debug!(title = %new_task.title, assignees = new_task.assignees.len(), "Store::create_task: called");
        let title = new_task.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::InvalidRecord("title is required".to_string()));
        }
        if new_task.assignees.is_empty() {
            return Err(StoreError::InvalidRecord("at least one assignee is required".to_string()));
        }

        let task = TaskRecord {
            id: Uuid::now_v7().to_string(),
            title,
            assignees: new_task.assignees,
            start_date: new_task.start_date,
            end_date: new_task.end_date,
            created_at: now_ms(),
        };

        let assignees = serde_json::to_string(&task.assignees)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tasks (id, title, assignees, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.title,
                assignees,
                task.start_date.format(DATE_FORMAT).to_string(),
                task.end_date.format(DATE_FORMAT).to_string(),
                task.created_at
            ],
        )?;

        info!(id = %task.id, title = %task.title, "Created task");
        Ok(task)
    }

    /// Fetch a task by id
    pub fn get_task(&self, id: &str) -> StoreResult<Option<TaskRecord>> {
        debug!(%id, "Store::get_task: called");
        let conn = self.conn()?;
        let raw = conn
            .query_row(&format!("{TASK_SELECT_SQL} WHERE id = ?1"), params![id], map_raw_task)
            .optional()?;
        raw.map(RawTask::into_record).transpose()
    }

    /// Number of stored tasks
    pub fn count_tasks(&self) -> StoreResult<usize> {
        debug!("Store::count_tasks: called");
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn bootstrap_connection(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        credential: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Task row before JSON and date columns are decoded
struct RawTask {
    id: String,
    title: String,
    assignees: String,
    start_date: String,
    end_date: String,
    created_at: i64,
}

impl RawTask {
    fn into_record(self) -> StoreResult<TaskRecord> {
        let assignees: Vec<String> = serde_json::from_str(&self.assignees)?;
        Ok(TaskRecord {
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            id: self.id,
            title: self.title,
            assignees,
            created_at: self.created_at,
        })
    }
}

fn map_raw_task(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        title: row.get(1)?,
        assignees: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn parse_date(value: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| StoreError::InvalidData(format!("bad date '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_create_user_normalizes_email() {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user(NewUser::new("  Alice ", " Alice@Example.COM ", "pw"))
            .unwrap();

        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(store.user_by_email("ALICE@example.com").unwrap().is_some());
        assert_eq!(store.user_by_id(&user.id).unwrap(), Some(user));
        assert!(store.user_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_clones_share_one_database() {
        let store = Store::open_in_memory().unwrap();
        let handle = store.clone();

        let worker = std::thread::spawn(move || handle.create_user(NewUser::new("Bob", "bob@example.com", "pw")));
        worker.join().unwrap().unwrap();

        assert_eq!(store.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_create_user_rejects_duplicate_email() {
        let store = Store::open_in_memory().unwrap();
        store.create_user(NewUser::new("Alice", "alice@example.com", "pw")).unwrap();

        let err = store
            .create_user(NewUser::new("Other Alice", "ALICE@example.com", "pw"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(ref e) if e == "alice@example.com"));
    }

    #[test]
    fn test_create_user_requires_fields() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.create_user(NewUser::new(" ", "a@x.com", "pw")),
            Err(StoreError::InvalidRecord(_))
        ));
        assert!(matches!(
            store.create_user(NewUser::new("A", "", "pw")),
            Err(StoreError::InvalidRecord(_))
        ));
        assert!(matches!(
            store.create_user(NewUser::new("A", "a@x.com", "")),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_users_by_name_is_case_insensitive_exact() {
        let store = Store::open_in_memory().unwrap();
        store.create_user(NewUser::new("Sam", "sam1@example.com", "pw")).unwrap();
        store.create_user(NewUser::new("sam", "sam2@example.com", "pw")).unwrap();
        store.create_user(NewUser::new("Samantha", "samantha@example.com", "pw")).unwrap();

        let matches = store.users_by_name("SAM").unwrap();
        let emails: Vec<_> = matches.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["sam1@example.com", "sam2@example.com"]);

        assert!(store.users_by_name("Sa").unwrap().is_empty());
        assert!(store.users_by_name("").unwrap().is_empty());
    }

    #[test]
    fn test_create_and_get_task() {
        let store = Store::open_in_memory().unwrap();
        let task = store
            .create_task(NewTask {
                title: " Review ".to_string(),
                assignees: vec!["u1".to_string(), "u2".to_string()],
                start_date: date("2026-10-19"),
                end_date: date("2026-10-20"),
            })
            .unwrap();

        assert_eq!(task.title, "Review");
        let loaded = store.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        assert_eq!(store.count_tasks().unwrap(), 1);
        assert!(store.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn test_create_task_validates() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .create_task(NewTask {
                title: "   ".to_string(),
                assignees: vec!["u1".to_string()],
                start_date: date("2026-10-19"),
                end_date: date("2026-10-19"),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));

        let err = store
            .create_task(NewTask {
                title: "Review".to_string(),
                assignees: vec![],
                start_date: date("2026-10-19"),
                end_date: date("2026-10-19"),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(store.count_tasks().unwrap(), 0);
    }
}
