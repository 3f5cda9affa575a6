//! On-disk persistence tests for TaskStore

use chrono::NaiveDate;
use taskstore::{NewTask, NewUser, Store, latest_version};
use tempfile::TempDir;

#[test]
fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested").join("voicetask.db");

    let task_id = {
        let store = Store::open(&db_path).expect("Failed to open store");
        let alice = store
            .create_user(NewUser::new("Alice", "alice@example.com", "pw"))
            .expect("Failed to create user");
        let task = store
            .create_task(NewTask {
                title: "Quarterly review".to_string(),
                assignees: vec![alice.id.clone()],
                start_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            })
            .expect("Failed to create task");
        task.id
    };

    let store = Store::open(&db_path).expect("Failed to reopen store");
    let users = store.list_users().expect("Failed to list users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "alice@example.com");

    let task = store.get_task(&task_id).expect("Failed to get task").expect("Task missing");
    assert_eq!(task.title, "Quarterly review");
    assert_eq!(task.assignees, vec![users[0].id.clone()]);
}

#[test]
fn test_newer_schema_refused_on_open() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("future.db");

    {
        let conn = rusqlite::Connection::open(&db_path).expect("Failed to open sqlite");
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 5))
            .expect("Failed to bump version");
    }

    let result = Store::open(&db_path);
    assert!(matches!(
        result,
        Err(taskstore::StoreError::UnsupportedSchemaVersion { .. })
    ));
}
