//! End-to-end flow scenarios against an in-memory store and a scripted
//! extraction service

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use taskstore::{NewUser, Store};
use voicetask::error::UserRef;
use voicetask::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use voicetask::{Extractor, FlowError, FlowOutcome, PromptLoader, TaskAssistant, TaskRequest};

/// Replies with the same text on every call
struct ScriptedLlm {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse::text(self.reply.clone()))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn store_with(users: &[(&str, &str)]) -> Arc<Store> {
    let store = Store::open_in_memory().unwrap();
    for (name, email) in users {
        store.create_user(NewUser::new(*name, *email, "secret")).unwrap();
    }
    Arc::new(store)
}

fn assistant(store: &Arc<Store>, llm: Arc<ScriptedLlm>) -> TaskAssistant {
    TaskAssistant::with_store(Extractor::new(llm, PromptLoader::embedded_only()), store.clone())
}

#[tokio::test]
async fn test_review_with_alice_and_bob_tomorrow() {
    let store = store_with(&[("Alice", "alice@example.com"), ("Bob", "bob@example.com")]);
    let tomorrow = today().checked_add_days(Days::new(1)).unwrap();
    let llm = ScriptedLlm::new(format!(
        "```json\n{{\"title\": \"Schedule a review\", \"assignTo\": [\"Alice\", \"Bob\"], \"startdate\": \"{tomorrow}\", \"enddate\": \"\"}}\n```"
    ));

    let outcome = assistant(&store, llm)
        .handle(TaskRequest::new("Schedule a review with Alice and Bob tomorrow"), today())
        .await
        .unwrap();

    let FlowOutcome::Created(summary) = outcome else {
        panic!("expected a created task");
    };
    assert!(summary.title.to_lowercase().contains("review"));
    let names: Vec<_> = summary.assignees.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
    assert_eq!(summary.start_date, tomorrow);
    assert_eq!(summary.end_date, tomorrow);
    assert_eq!(store.count_tasks().unwrap(), 1);
}

#[tokio::test]
async fn test_two_sams_need_clarification() {
    let store = store_with(&[("Sam", "sam.a@example.com"), ("Sam", "sam.b@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "Review", "assignTo": ["Sam"], "startdate": "", "enddate": ""}"#);

    let outcome = assistant(&store, llm)
        .handle(TaskRequest::new("Schedule a review with Sam tomorrow"), today())
        .await
        .unwrap();

    let FlowOutcome::NeedsClarification(records) = outcome else {
        panic!("expected clarification");
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Sam");
    let emails: Vec<_> = records[0].options.iter().map(|o| o.email.as_str()).collect();
    assert_eq!(emails, vec!["sam.a@example.com", "sam.b@example.com"]);
    assert_eq!(store.count_tasks().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_email_creates_nothing() {
    let store = store_with(&[("Alice", "alice@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "Review", "assignTo": ["Alice"], "startdate": "", "enddate": ""}"#);

    let request = TaskRequest::new("Review with Alice").with_emails(vec!["ghost@x.com".to_string()]);
    let err = assistant(&store, llm).handle(request, today()).await.unwrap_err();

    assert!(matches!(err, FlowError::UserNotFound(UserRef::Email(ref e)) if e == "ghost@x.com"));
    assert!(err.public_message().contains("ghost@x.com"));
    assert_eq!(store.count_tasks().unwrap(), 0);
}

#[tokio::test]
async fn test_blank_email_creates_nothing() {
    let store = store_with(&[("Alice", "alice@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "Review", "assignTo": ["Alice"], "startdate": "", "enddate": ""}"#);

    let request = TaskRequest::new("Review with Alice").with_emails(vec!["   ".to_string()]);
    let err = assistant(&store, llm).handle(request, today()).await.unwrap_err();

    assert!(matches!(err, FlowError::UserNotFound(UserRef::Email(ref e)) if e.is_empty()));
    assert_eq!(store.count_tasks().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_name_creates_nothing() {
    let store = store_with(&[("Alice", "alice@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "Review", "assignTo": ["Alice", "Zed"], "startdate": "", "enddate": ""}"#);

    let err = assistant(&store, llm)
        .handle(TaskRequest::new("Review with Alice and Zed"), today())
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::UserNotFound(UserRef::Name(ref n)) if n == "Zed"));
    assert_eq!(store.count_tasks().unwrap(), 0);
}

#[tokio::test]
async fn test_clarification_round_trip() {
    let store = store_with(&[
        ("Sam", "sam.a@example.com"),
        ("Sam", "sam.b@example.com"),
        ("Alice", "alice@example.com"),
        ("Carol", "carol@example.com"),
    ]);
    let reply = r#"{"title": "Plan offsite", "assignTo": ["Sam", "Alice"], "startdate": "2026-11-02", "enddate": "2026-11-03"}"#;
    let text = "Plan the offsite with Sam and Alice";

    let first = assistant(&store, ScriptedLlm::new(reply))
        .handle(TaskRequest::new(text), today())
        .await
        .unwrap();
    assert!(matches!(first, FlowOutcome::NeedsClarification(_)));

    // Same text again, plus the chosen Sam and an explicit extra assignee
    let llm = ScriptedLlm::new(reply);
    let request = TaskRequest::new(text).with_emails(vec![
        "sam.b@example.com".to_string(),
        "carol@example.com".to_string(),
        "SAM.B@example.com".to_string(),
    ]);
    let second = assistant(&store, llm.clone()).handle(request, today()).await.unwrap();

    let FlowOutcome::Created(summary) = second else {
        panic!("expected a created task");
    };
    let emails: Vec<_> = summary.assignees.iter().map(|a| a.email.as_str()).collect();
    assert_eq!(emails, vec!["sam.b@example.com", "carol@example.com", "alice@example.com"]);
    assert_eq!(llm.calls(), 1);
    assert_eq!(store.count_tasks().unwrap(), 1);
}

#[tokio::test]
async fn test_no_dates_default_to_today() {
    let store = store_with(&[("Alice", "alice@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "Water plants", "assignTo": ["Alice"]}"#);

    let outcome = assistant(&store, llm)
        .handle(TaskRequest::new("Alice, water the plants"), today())
        .await
        .unwrap();

    let FlowOutcome::Created(summary) = outcome else {
        panic!("expected a created task");
    };
    assert_eq!(summary.start_date, today());
    assert_eq!(summary.end_date, today());
}

#[tokio::test]
async fn test_empty_title_is_validation_error() {
    let store = store_with(&[("Alice", "alice@example.com")]);
    let llm = ScriptedLlm::new(r#"{"title": "  ", "assignTo": ["Alice"], "startdate": "", "enddate": ""}"#);

    let err = assistant(&store, llm)
        .handle(TaskRequest::new("Alice"), today())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
    assert_eq!(store.count_tasks().unwrap(), 0);
}

#[tokio::test]
async fn test_no_assignees_is_validation_error() {
    let store = store_with(&[]);
    let llm = ScriptedLlm::new(r#"{"title": "Buy milk", "assignTo": [], "startdate": "", "enddate": ""}"#);

    let err = assistant(&store, llm)
        .handle(TaskRequest::new("Buy milk"), today())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
}

fn recase(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_unique_name_resolves_regardless_of_casing(mask in proptest::collection::vec(any::<bool>(), 1..12)) {
        let spoken = recase("Bartholomew", &mask);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let summary = rt.block_on(async {
            let store = store_with(&[("Bartholomew", "bart@example.com"), ("Alice", "alice@example.com")]);
            let llm = ScriptedLlm::new(format!(
                r#"{{"title": "Sweep", "assignTo": ["{spoken}"], "startdate": "", "enddate": ""}}"#
            ));
            assistant(&store, llm).handle(TaskRequest::new("sweep the floor"), today()).await
        });

        match summary {
            Ok(FlowOutcome::Created(summary)) => {
                prop_assert_eq!(summary.assignees.len(), 1);
                prop_assert_eq!(summary.assignees[0].email.as_str(), "bart@example.com");
            }
            other => prop_assert!(false, "unexpected outcome: {:?}", other),
        }
    }
}
