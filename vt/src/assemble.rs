//! Task assembly: date defaulting, validation and the single persist

use async_trait::async_trait;
use chrono::NaiveDate;
use taskstore::{NewTask, Store, StoreError, TaskRecord, User};
use tracing::{debug, info};

use crate::blocking::run_blocking;
use crate::domain::TaskSummary;
use crate::error::FlowError;

/// Single-record task creation
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<TaskRecord, StoreError>;
}

#[async_trait]
impl TaskSink for Store {
    async fn create_task(&self, task: NewTask) -> Result<TaskRecord, StoreError> {
        run_blocking(self, move |store| store.create_task(task)).await
    }
}

/// Fill in missing dates
///
/// Start falls back to `today`; end falls back to the resolved start.
/// An end before the start is kept as given.
pub fn resolve_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let start = start.unwrap_or(today);
    let end = end.unwrap_or(start);
    (start, end)
}

/// Validate, persist once and summarize a task
pub async fn assemble_task(
    sink: &dyn TaskSink,
    title: &str,
    users: &[User],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<TaskSummary, FlowError> {
    debug!(%title, assignees = users.len(), "assemble_task: called");
    let title = title.trim();
    if title.is_empty() {
        return Err(FlowError::Validation("Task title is required.".to_string()));
    }
    if users.is_empty() {
        return Err(FlowError::Validation("At least one assignee is required.".to_string()));
    }

    let (start_date, end_date) = resolve_dates(start, end, today);
    let record = sink
        .create_task(NewTask {
            title: title.to_string(),
            assignees: users.iter().map(|u| u.id.clone()).collect(),
            start_date,
            end_date,
        })
        .await?;

    info!(id = %record.id, %start_date, %end_date, "Assembled task");
    Ok(TaskSummary::from_record(&record, users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskstore::NewUser;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_dates_defaults() {
        let today = date(2026, 10, 18);
        assert_eq!(resolve_dates(None, None, today), (today, today));
        assert_eq!(
            resolve_dates(Some(date(2026, 10, 20)), None, today),
            (date(2026, 10, 20), date(2026, 10, 20))
        );
        assert_eq!(
            resolve_dates(None, Some(date(2026, 10, 25)), today),
            (today, date(2026, 10, 25))
        );
    }

    #[test]
    fn test_resolve_dates_keeps_inverted_range() {
        let today = date(2026, 10, 18);
        let (start, end) = resolve_dates(Some(date(2026, 10, 22)), Some(date(2026, 10, 20)), today);
        assert_eq!(start, date(2026, 10, 22));
        assert_eq!(end, date(2026, 10, 20));
    }

    #[tokio::test]
    async fn test_assemble_persists_and_summarizes() {
        let store = Store::open_in_memory().unwrap();
        let alice = store
            .create_user(NewUser::new("Alice", "alice@example.com", "pw"))
            .unwrap();

        let summary = assemble_task(&store, "  Review budget ", &[alice.clone()], None, None, date(2026, 10, 18))
            .await
            .unwrap();

        assert_eq!(summary.title, "Review budget");
        assert_eq!(summary.start_date, date(2026, 10, 18));
        assert_eq!(summary.end_date, date(2026, 10, 18));
        assert_eq!(summary.assignees[0].email, "alice@example.com");

        let record = store.get_task(&summary.id).unwrap().unwrap();
        assert_eq!(record.assignees, vec![alice.id]);
    }

    #[tokio::test]
    async fn test_assemble_rejects_without_persisting() {
        let store = Store::open_in_memory().unwrap();
        let alice = store
            .create_user(NewUser::new("Alice", "alice@example.com", "pw"))
            .unwrap();
        let today = date(2026, 10, 18);

        let err = assemble_task(&store, "   ", &[alice], None, None, today).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));

        let err = assemble_task(&store, "Review", &[], None, None, today).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));

        assert_eq!(store.count_tasks().unwrap(), 0);
    }
}
